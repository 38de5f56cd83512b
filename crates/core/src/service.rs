//! Sync service facade - the single entry point for schedulers and the
//! presentation layer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use roomsync_domain::{
    DateRange, DayClearNotification, HistoryEvent, Reservation, ReservationStatus, Result,
    RoomSyncError, Room, SlotKey,
};
use tracing::{debug, instrument, warn};

use crate::detector::DayClearDetector;
use crate::notifications::NotificationCenter;
use crate::ports::{CachePolicy, ReservationRepository};
use crate::store::ReservationStore;
use crate::transition::{StatusTransitionEngine, TransitionOutcome};

/// Currently viewed calendar month plus a generation counter.
///
/// Fetches capture the generation when issued; a result whose generation no
/// longer matches is a stale response from an earlier navigation and is
/// discarded for store purposes (the detector still observes it - the
/// notified set makes that safe).
#[derive(Debug, Clone, Copy)]
struct ViewState {
    year: i32,
    month: u32,
    generation: u64,
}

/// Facade wiring the store, detector, notification center, and transition
/// engine over the repository port. All polling loops and user-facing
/// operations go through here.
pub struct SyncService {
    repo: Arc<dyn ReservationRepository>,
    store: Arc<Mutex<ReservationStore>>,
    engine: StatusTransitionEngine,
    detector: Mutex<DayClearDetector>,
    center: Mutex<NotificationCenter>,
    user: Mutex<String>,
    view: Mutex<ViewState>,
    /// Held while a notes edit is mid-save so the silent refresh cannot
    /// clobber the in-progress edit.
    edit_in_progress: AtomicBool,
    last_event_pull: Mutex<Option<DateTime<Utc>>>,
    /// Widest span the server accepts per range request; wider sweeps are
    /// chunked.
    max_range_days: u32,
}

impl SyncService {
    pub fn new(repo: Arc<dyn ReservationRepository>, user: &str, max_range_days: u32) -> Self {
        let store = Arc::new(Mutex::new(ReservationStore::new()));
        let engine = StatusTransitionEngine::new(Arc::clone(&repo), Arc::clone(&store));
        let today = Utc::now().date_naive();
        Self {
            repo,
            store,
            engine,
            detector: Mutex::new(DayClearDetector::new(user)),
            center: Mutex::new(NotificationCenter::new()),
            user: Mutex::new(user.to_string()),
            view: Mutex::new(ViewState { year: today.year(), month: today.month(), generation: 0 }),
            edit_in_progress: AtomicBool::new(false),
            last_event_pull: Mutex::new(None),
            max_range_days,
        }
    }

    fn store(&self) -> MutexGuard<'_, ReservationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn detector(&self) -> MutexGuard<'_, DayClearDetector> {
        self.detector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn center(&self) -> MutexGuard<'_, NotificationCenter> {
        self.center.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn user(&self) -> String {
        self.user.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Switch the authenticated identity. A different user (case-insensitive)
    /// tears down every piece of session state, including the repository's
    /// read cache, so nothing leaks between sessions.
    pub fn set_user(&self, user: &str) {
        let changed = {
            let mut current = self.user.lock().unwrap_or_else(PoisonError::into_inner);
            let changed = !current.eq_ignore_ascii_case(user);
            *current = user.to_string();
            changed
        };
        if changed {
            debug!(user, "identity changed; clearing session state");
            self.repo.invalidate_cache();
            self.store().clear();
            self.detector().reset(user);
            self.center().clear();
            *self.last_event_pull.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }
    }

    /// Drop cached and derived state while keeping the identity; the next
    /// fetches rebuild everything from the server.
    pub fn invalidate(&self) {
        let user = self.user();
        self.repo.invalidate_cache();
        self.store().clear();
        self.detector().reset(&user);
        self.center().clear();
    }

    /// Run a detector pass and publish what it emits.
    fn observe_and_publish(&self, reservations: &[Reservation]) -> usize {
        let emitted = self.detector().observe(reservations);
        if emitted.is_empty() {
            return 0;
        }
        let mut center = self.center();
        emitted.into_iter().filter(|n| center.add(n.clone())).count()
    }

    /// Navigate to a month and fetch it. One-shot per navigation, not a loop.
    #[instrument(skip(self))]
    pub async fn view_month(&self, year: i32, month: u32) -> Result<Vec<Reservation>> {
        let range = DateRange::month(year, month)
            .ok_or_else(|| RoomSyncError::InvalidInput(format!("invalid month {year}-{month}")))?;
        let generation = {
            let mut view = self.view();
            view.year = year;
            view.month = month;
            view.generation += 1;
            view.generation
        };

        let fetched = self.repo.fetch_range(range, CachePolicy::Default).await?;
        self.observe_and_publish(&fetched);

        if self.view().generation == generation {
            self.store().apply_range(range, fetched.clone());
        } else {
            debug!(year, month, "stale month fetch discarded");
        }
        Ok(fetched)
    }

    /// Refresh the currently viewed month. Returns `false` when skipped
    /// because a notes edit is mid-save.
    #[instrument(skip(self))]
    pub async fn refresh_viewed(&self, policy: CachePolicy) -> Result<bool> {
        if self.edit_in_progress.load(Ordering::SeqCst) {
            debug!("refresh skipped: notes edit in progress");
            return Ok(false);
        }

        let (year, month, generation) = {
            let view = self.view();
            (view.year, view.month, view.generation)
        };
        let range = DateRange::month(year, month)
            .ok_or_else(|| RoomSyncError::Internal(format!("invalid viewed month {year}-{month}")))?;

        let fetched = self.repo.fetch_range(range, policy).await?;
        self.observe_and_publish(&fetched);

        if self.view().generation == generation {
            self.store().apply_range(range, fetched);
        } else {
            debug!(year, month, "stale refresh discarded");
        }
        Ok(true)
    }

    /// Detector pass over an arbitrary range (wide sweep, horizon sweep,
    /// post-mutation re-fetch). Ranges wider than the server's per-request
    /// guard are fetched in contiguous chunks and observed as one aggregated
    /// set. Returns the number of notifications emitted.
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    pub async fn sweep(&self, range: DateRange, policy: CachePolicy) -> Result<usize> {
        let mut aggregated: Vec<Reservation> = Vec::new();
        for chunk in range.chunked(self.max_range_days) {
            let fetched = self.repo.fetch_range(chunk, policy).await?;
            for reservation in fetched {
                // Reservations spanning a chunk boundary come back twice.
                if !aggregated.iter().any(|known| known.id == reservation.id) {
                    aggregated.push(reservation);
                }
            }
        }

        let emitted = self.observe_and_publish(&aggregated);
        self.store().apply_range(range, aggregated);
        Ok(emitted)
    }

    /// Months covered by a reservation's dates, as a single inclusive range.
    fn affected_range(&self, id: &str) -> Option<DateRange> {
        let store = self.store();
        let reservation = store.get(id)?;
        let first = reservation.dates.iter().min()?;
        let last = reservation.dates.iter().max()?;
        Some(DateRange::new(*first, *last))
    }

    /// Change a reservation's status with optimistic update, server
    /// confirmation, and - on success - a cache-bypassing re-fetch of the
    /// affected range so server-side side effects land immediately.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: &str,
        next: ReservationStatus,
    ) -> Result<TransitionOutcome> {
        let affected = self.affected_range(id);
        let outcome = self.engine.change_status(id, next).await?;
        if outcome == TransitionOutcome::Applied {
            self.resync_after_mutation(affected).await;
        }
        Ok(outcome)
    }

    /// Remove one day from a multi-day reservation (the reservation itself
    /// survives). Removing the final day is rejected; deletion is the right
    /// path for that.
    pub async fn remove_day(&self, id: &str, day: NaiveDate) -> Result<Reservation> {
        let updated = self.engine.remove_day(id, day).await?;
        self.resync_after_mutation(Some(DateRange::new(day, day))).await;
        Ok(updated)
    }

    pub async fn delete_reservation(&self, id: &str) -> Result<()> {
        let affected = self.affected_range(id);
        self.engine.delete(id).await?;
        self.resync_after_mutation(affected).await;
        Ok(())
    }

    /// Edit a reservation's notes. The silent refresh is deferred while the
    /// save is in flight so it cannot clobber the edit.
    pub async fn edit_notes(
        &self,
        id: &str,
        notes: Option<String>,
        admin_notes: Option<String>,
    ) -> Result<Reservation> {
        self.edit_in_progress.store(true, Ordering::SeqCst);
        let result = self.engine.edit_notes(id, notes, admin_notes).await;
        self.edit_in_progress.store(false, Ordering::SeqCst);
        result
    }

    /// Post-mutation re-fetch; the mutation already succeeded, so a failed
    /// re-fetch is logged and absorbed (the next scheduled pass catches up).
    async fn resync_after_mutation(&self, affected: Option<DateRange>) {
        let Some(range) = affected else { return };
        if let Err(err) = self.sweep(range, CachePolicy::Bypass).await {
            warn!(error = %err, "post-mutation re-fetch failed");
        }
    }

    pub async fn history(&self, day: NaiveDate, room: &Room) -> Result<Vec<HistoryEvent>> {
        self.repo.fetch_history(day, room).await
    }

    /// Merge the server-authoritative day-clear feed into the notification
    /// list. Server-announced slots are seeded into the detector's notified
    /// set so the client-side diff never duplicates them. Returns the number
    /// of new notifications.
    #[instrument(skip(self))]
    pub async fn pull_server_events(&self) -> Result<usize> {
        let since = *self.last_event_pull.lock().unwrap_or_else(PoisonError::into_inner);
        // Captured before the fetch so events created while the request is in
        // flight stay inside the next window.
        let pull_started = Utc::now();
        let events = self.repo.fetch_day_clear_events(since).await?;

        let mut added = 0;
        {
            let mut detector = self.detector();
            let mut center = self.center();
            for event in events {
                detector.seed_notified([event.slot()]);
                if center.add(DayClearNotification::from_server(event)) {
                    added += 1;
                }
            }
        }
        *self.last_event_pull.lock().unwrap_or_else(PoisonError::into_inner) = Some(pull_started);
        Ok(added)
    }

    /// Dismiss one notification, acknowledging it remotely when it came from
    /// the server feed. Returns whether the id was known.
    pub async fn consume_notification(&self, id: &str) -> Result<bool> {
        match self.center().consume(id) {
            None => Ok(false),
            Some(None) => Ok(true),
            Some(Some(event_id)) => {
                self.repo.consume_event(&event_id).await?;
                Ok(true)
            }
        }
    }

    /// Dismiss all notifications; server-sourced ones are acknowledged in
    /// bulk. Returns how many were dismissed.
    pub async fn consume_all_notifications(&self) -> Result<usize> {
        let (count, acks) = {
            let mut center = self.center();
            let count = center.len();
            (count, center.consume_all())
        };
        if !acks.is_empty() {
            self.repo.consume_events(&acks).await?;
        }
        Ok(count)
    }

    pub fn notifications(&self) -> Vec<DayClearNotification> {
        self.center().items()
    }

    /// Ask the calendar to navigate to a slot (consumed once).
    pub fn request_open(&self, slot: SlotKey) {
        self.center().request_open(slot);
    }

    pub fn take_open_request(&self) -> Option<SlotKey> {
        self.center().take_open_request()
    }

    /// Number of the user's pre-reservations currently blocked by someone
    /// else's occupying reservation; the focused poll runs while this is
    /// non-zero.
    pub fn blocked_pre_count(&self) -> usize {
        self.blocked_pre_slots().len()
    }

    /// The slots behind [`Self::blocked_pre_count`]; the focused poll uses
    /// them to pick which months to re-fetch.
    pub fn blocked_pre_slots(&self) -> std::collections::BTreeSet<SlotKey> {
        let user = self.user();
        self.store().blocked_pre_slots(&user)
    }

    pub fn viewed_month(&self) -> (i32, u32) {
        let view = self.view();
        (view.year, view.month)
    }

    /// Local copies for a slot (calendar day popup).
    pub fn reservations_for_slot(&self, slot: &SlotKey) -> Vec<Reservation> {
        self.store().for_slot(slot)
    }
}
