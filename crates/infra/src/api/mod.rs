//! Reservation API adapter.
//!
//! Implements the `ReservationRepository` port over HTTP, adding the read
//! cache and in-flight request coalescing the polling loops rely on.

pub mod auth;
pub mod client;

pub use auth::{SessionProvider, StaticSession};
pub use client::{ReservationApiClient, ReservationApiConfig};
