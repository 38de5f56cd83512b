//! Engine wiring the API client, sync service, and scheduler together.

pub mod engine;

pub use engine::SyncEngine;
