//! # RoomSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The occupancy snapshot builder and day-clear detector
//! - The optimistic reservation store and status transition engine
//! - The notification center and the `SyncService` facade
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `roomsync-domain`
//! - No HTTP or timer code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod detector;
pub mod notifications;
pub mod occupancy;
pub mod ports;
pub mod service;
pub mod store;
pub mod transition;

// Re-export specific items to avoid ambiguity
pub use detector::DayClearDetector;
pub use notifications::NotificationCenter;
pub use occupancy::OccupancySnapshot;
pub use ports::{CachePolicy, ReservationRepository};
pub use service::SyncService;
pub use store::ReservationStore;
pub use transition::{StatusTransitionEngine, TransitionOutcome};
