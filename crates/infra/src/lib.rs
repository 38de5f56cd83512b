//! # RoomSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - HTTP client with retry and backoff
//! - Reservation API client (caching, request coalescing)
//! - Polling schedulers for the sweep cadences
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `roomsync-core`
//! - Depends on `roomsync-domain` and `roomsync-core`
//! - Contains all "impure" code (network I/O, timers)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use api::{ReservationApiClient, ReservationApiConfig, SessionProvider, StaticSession};
pub use errors::InfraError;
pub use http::HttpClient;
pub use scheduling::{SweepScheduler, SweepSchedulerConfig};
pub use sync::SyncEngine;
