//! Scheduling infrastructure for the polling loops.
//!
//! One scheduler owns the four cadences:
//! - Silent refresh of the viewed month (jittered minutes)
//! - Focused poll while the user has blocked pre-reservations (fixed seconds)
//! - Wide sweep over the months around the viewed one (jittered minutes)
//! - Horizon sweep over the multi-year future (jittered hours)
//!
//! All loops follow the same runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support

pub mod error;
pub mod sweep_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sweep_scheduler::{SweepScheduler, SweepSchedulerConfig};
