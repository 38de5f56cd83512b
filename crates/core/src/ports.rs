//! Port interfaces for the reservation repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use roomsync_domain::{
    DateRange, DayClearEvent, HistoryEvent, Reservation, ReservationPatch, ReservationStatus,
    Result, Room,
};

/// Read-cache behavior for a range fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve from the short-TTL cache when a fresh entry exists.
    #[default]
    Default,
    /// Skip the cache and issue a fresh request (the `noCache` flag);
    /// the result still repopulates the cache.
    Bypass,
}

/// Remote reservation store, as seen by the sync core.
///
/// Implementations own network I/O, the short-TTL read cache, in-flight
/// request coalescing, and rate-limit retries. Conflict (HTTP 409) on a
/// status update surfaces as `RoomSyncError::Conflict`.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// All reservations intersecting any day in `range` (inclusive).
    async fn fetch_range(&self, range: DateRange, policy: CachePolicy)
        -> Result<Vec<Reservation>>;

    /// Change a reservation's status. `Err(Conflict)` when another occupying
    /// reservation already holds one of its room+day slots.
    async fn update_status(&self, id: &str, status: ReservationStatus) -> Result<()>;

    /// Partial update (e.g. trimming one entry out of `dates`).
    async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation>;

    async fn delete_reservation(&self, id: &str) -> Result<()>;

    /// Ordered audit trail for a single room+day.
    async fn fetch_history(&self, day: NaiveDate, room: &Room) -> Result<Vec<HistoryEvent>>;

    /// Server-authoritative day-clear feed.
    async fn fetch_day_clear_events(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DayClearEvent>>;

    async fn consume_event(&self, id: &str) -> Result<()>;

    async fn consume_events(&self, ids: &[String]) -> Result<()>;

    /// Drop all cached ranges and in-flight trackers. Must be called when
    /// the authenticated identity changes so one user's cached view never
    /// leaks into another session.
    fn invalidate_cache(&self);
}
