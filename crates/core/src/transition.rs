//! Status transition engine with optimistic updates and rollback

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use roomsync_domain::{
    Reservation, ReservationPatch, ReservationStatus, Result, RoomSyncError,
};
use tracing::{debug, warn};

use crate::ports::ReservationRepository;
use crate::store::ReservationStore;

/// Outcome of a status change as surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Server accepted the change; caller should re-fetch the affected range
    /// bypassing the cache.
    Applied,
    /// Server reported a double-booking (409); the optimistic edit was
    /// rolled back and the user should be told the slot is taken.
    Conflict,
}

/// Applies reservation mutations optimistically against the local store,
/// confirms them with the server, and rolls back on failure.
pub struct StatusTransitionEngine {
    repo: Arc<dyn ReservationRepository>,
    store: Arc<Mutex<ReservationStore>>,
}

impl StatusTransitionEngine {
    pub fn new(repo: Arc<dyn ReservationRepository>, store: Arc<Mutex<ReservationStore>>) -> Self {
        Self { repo, store }
    }

    fn store(&self) -> MutexGuard<'_, ReservationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change a reservation's status.
    ///
    /// The local record is updated before the server call; a 409 rolls it
    /// back and yields [`TransitionOutcome::Conflict`], any other failure
    /// rolls back and propagates.
    pub async fn change_status(
        &self,
        id: &str,
        next: ReservationStatus,
    ) -> Result<TransitionOutcome> {
        let previous = {
            let mut store = self.store();
            let current = store
                .get(id)
                .map(|reservation| reservation.reservation_status)
                .ok_or_else(|| RoomSyncError::NotFound(format!("reservation {id}")))?;
            validate_transition(current, next)?;
            match store.set_status(id, next) {
                Some(previous) => previous,
                None => return Err(RoomSyncError::NotFound(format!("reservation {id}"))),
            }
        };

        match self.repo.update_status(id, next).await {
            Ok(()) => {
                debug!(id, ?next, "status change confirmed");
                Ok(TransitionOutcome::Applied)
            }
            Err(err) if err.is_conflict() => {
                warn!(id, ?next, "status change conflicted; rolling back");
                self.store().set_status(id, previous);
                Ok(TransitionOutcome::Conflict)
            }
            Err(err) => {
                warn!(id, ?next, error = %err, "status change failed; rolling back");
                self.store().set_status(id, previous);
                Err(err)
            }
        }
    }

    /// Trim a single day out of a multi-day reservation.
    ///
    /// Removing the last remaining day is rejected at the call site; deleting
    /// the reservation is the right path for that.
    pub async fn remove_day(&self, id: &str, day: NaiveDate) -> Result<Reservation> {
        let remaining: Vec<NaiveDate> = {
            let store = self.store();
            let reservation = store
                .get(id)
                .ok_or_else(|| RoomSyncError::NotFound(format!("reservation {id}")))?;
            if !reservation.dates.contains(&day) {
                return Err(RoomSyncError::InvalidInput(format!(
                    "reservation {id} does not cover {day}"
                )));
            }
            if reservation.dates.len() == 1 {
                return Err(RoomSyncError::InvalidInput(
                    "cannot remove the last remaining day; delete the reservation instead".into(),
                ));
            }
            reservation.dates.iter().copied().filter(|candidate| *candidate != day).collect()
        };

        let patch = ReservationPatch { dates: Some(remaining), ..ReservationPatch::default() };
        let updated = self.repo.update_fields(id, &patch).await?;
        self.store().apply_one(updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.repo.delete_reservation(id).await?;
        self.store().remove(id);
        Ok(())
    }

    /// Update the free-text notes of a reservation.
    pub async fn edit_notes(
        &self,
        id: &str,
        notes: Option<String>,
        admin_notes: Option<String>,
    ) -> Result<Reservation> {
        let patch = ReservationPatch { notes, admin_notes, ..ReservationPatch::default() };
        let updated = self.repo.update_fields(id, &patch).await?;
        self.store().apply_one(updated.clone());
        Ok(updated)
    }
}

/// Legal moves of the status machine: pre -> confirmed, confirmed <-> flagged,
/// and any occupying status back to pre. Everything else is a caller bug.
fn validate_transition(current: ReservationStatus, next: ReservationStatus) -> Result<()> {
    use ReservationStatus::{Confirmed, Flagged, Pre};

    let allowed = matches!(
        (current, next),
        (Pre, Confirmed) | (Confirmed, Flagged) | (Flagged, Confirmed) | (Confirmed, Pre) | (Flagged, Pre)
    );
    if allowed {
        Ok(())
    } else {
        Err(RoomSyncError::InvalidInput(format!(
            "illegal status transition {current:?} -> {next:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use roomsync_domain::{DateRange, DayClearEvent, HistoryEvent, Room};

    use super::*;
    use crate::ports::CachePolicy;

    /// Mock repository whose `update_status` replies from a scripted queue.
    struct MockRepo {
        status_replies: Mutex<Vec<Result<()>>>,
        update_calls: AtomicUsize,
        records: Mutex<HashMap<String, Reservation>>,
    }

    impl MockRepo {
        fn new() -> Self {
            Self {
                status_replies: Mutex::new(Vec::new()),
                update_calls: AtomicUsize::new(0),
                records: Mutex::new(HashMap::new()),
            }
        }

        fn push_status_reply(&self, reply: Result<()>) {
            self.status_replies.lock().unwrap().push(reply);
        }

        fn stash(&self, reservation: Reservation) {
            self.records.lock().unwrap().insert(reservation.id.clone(), reservation);
        }
    }

    #[async_trait]
    impl ReservationRepository for MockRepo {
        async fn fetch_range(
            &self,
            _range: DateRange,
            _policy: CachePolicy,
        ) -> Result<Vec<Reservation>> {
            Ok(self.records.lock().unwrap().values().cloned().collect())
        }

        async fn update_status(&self, _id: &str, _status: ReservationStatus) -> Result<()> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.status_replies.lock().unwrap();
            if replies.is_empty() { Ok(()) } else { replies.remove(0) }
        }

        async fn update_fields(&self, id: &str, patch: &ReservationPatch) -> Result<Reservation> {
            let mut records = self.records.lock().unwrap();
            let reservation = records
                .get_mut(id)
                .ok_or_else(|| RoomSyncError::NotFound(id.to_string()))?;
            if let Some(dates) = &patch.dates {
                reservation.dates = dates.clone();
            }
            if let Some(notes) = &patch.notes {
                reservation.notes = Some(notes.clone());
            }
            if let Some(admin_notes) = &patch.admin_notes {
                reservation.admin_notes = Some(admin_notes.clone());
            }
            Ok(reservation.clone())
        }

        async fn delete_reservation(&self, id: &str) -> Result<()> {
            self.records.lock().unwrap().remove(id);
            Ok(())
        }

        async fn fetch_history(&self, _day: NaiveDate, _room: &Room) -> Result<Vec<HistoryEvent>> {
            Ok(Vec::new())
        }

        async fn fetch_day_clear_events(
            &self,
            _since: Option<DateTime<Utc>>,
        ) -> Result<Vec<DayClearEvent>> {
            Ok(Vec::new())
        }

        async fn consume_event(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn consume_events(&self, _ids: &[String]) -> Result<()> {
            Ok(())
        }

        fn invalidate_cache(&self) {}
    }

    fn reservation(id: &str, room: &str, dates: &[&str], author: &str, status: &str) -> Reservation {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "room": room,
            "dates": dates,
            "event": "Event",
            "author": author,
            "type": "event",
            "reservationStatus": status,
            "createdAt": "2025-05-01T10:00:00Z",
            "updatedAt": "2025-05-01T10:00:00Z",
        }))
        .unwrap()
    }

    fn engine_with(
        records: Vec<Reservation>,
    ) -> (StatusTransitionEngine, Arc<MockRepo>, Arc<Mutex<ReservationStore>>) {
        let repo = Arc::new(MockRepo::new());
        let store = Arc::new(Mutex::new(ReservationStore::new()));
        {
            let mut guard = store.lock().unwrap();
            for record in records {
                repo.stash(record.clone());
                guard.apply_one(record);
            }
        }
        let engine = StatusTransitionEngine::new(repo.clone() as Arc<dyn ReservationRepository>, store.clone());
        (engine, repo, store)
    }

    #[tokio::test]
    async fn successful_transition_applies() {
        let (engine, repo, store) =
            engine_with(vec![reservation("r2", "room 1", &["2025-06-10"], "bob", "pre")]);

        let outcome = engine.change_status("r2", ReservationStatus::Confirmed).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied);
        assert_eq!(repo.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.lock().unwrap().get("r2").unwrap().reservation_status,
            ReservationStatus::Confirmed
        );
    }

    /// Scenario: confirming a pre while the slot is taken elsewhere returns
    /// 409; the optimistic edit must be rolled back and occupancy unchanged.
    #[tokio::test]
    async fn conflict_rolls_back_optimistic_update() {
        let (engine, repo, store) = engine_with(vec![
            reservation("r1", "room 1", &["2025-06-10"], "alice", "confirmed"),
            reservation("r2", "room 1", &["2025-06-10"], "bob", "pre"),
        ]);
        repo.push_status_reply(Err(RoomSyncError::Conflict("slot taken".into())));

        let outcome = engine.change_status("r2", ReservationStatus::Confirmed).await.unwrap();
        assert_eq!(outcome, TransitionOutcome::Conflict);

        let store = store.lock().unwrap();
        assert_eq!(store.get("r2").unwrap().reservation_status, ReservationStatus::Pre);
        assert_eq!(store.get("r1").unwrap().reservation_status, ReservationStatus::Confirmed);

        // Invariant: no two occupying records share the slot after rollback.
        let occupying = store
            .all()
            .iter()
            .filter(|r| r.is_occupying())
            .count();
        assert_eq!(occupying, 1);
    }

    #[tokio::test]
    async fn generic_failure_rolls_back_and_propagates() {
        let (engine, repo, store) =
            engine_with(vec![reservation("r2", "room 1", &["2025-06-10"], "bob", "pre")]);
        repo.push_status_reply(Err(RoomSyncError::Network("boom".into())));

        let err = engine.change_status("r2", ReservationStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, RoomSyncError::Network(_)));
        assert_eq!(
            store.lock().unwrap().get("r2").unwrap().reservation_status,
            ReservationStatus::Pre
        );
    }

    #[tokio::test]
    async fn confirmed_and_flagged_toggle_freely() {
        let (engine, _repo, store) =
            engine_with(vec![reservation("r1", "room 1", &["2025-06-10"], "alice", "confirmed")]);

        engine.change_status("r1", ReservationStatus::Flagged).await.unwrap();
        assert_eq!(
            store.lock().unwrap().get("r1").unwrap().reservation_status,
            ReservationStatus::Flagged
        );
        engine.change_status("r1", ReservationStatus::Confirmed).await.unwrap();
        engine.change_status("r1", ReservationStatus::Pre).await.unwrap();
    }

    #[tokio::test]
    async fn pre_to_flagged_is_rejected_locally() {
        let (engine, repo, _store) =
            engine_with(vec![reservation("r2", "room 1", &["2025-06-10"], "bob", "pre")]);

        let err = engine.change_status("r2", ReservationStatus::Flagged).await.unwrap_err();
        assert!(matches!(err, RoomSyncError::InvalidInput(_)));
        assert_eq!(repo.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_reservation_is_not_found() {
        let (engine, _repo, _store) = engine_with(vec![]);
        let err = engine.change_status("ghost", ReservationStatus::Confirmed).await.unwrap_err();
        assert!(matches!(err, RoomSyncError::NotFound(_)));
    }

    /// Scenario: removing one day of a three-day reservation keeps the other
    /// two and does not delete the record.
    #[tokio::test]
    async fn remove_day_trims_dates() {
        let (engine, _repo, store) = engine_with(vec![reservation(
            "r5",
            "room 1",
            &["2025-07-01", "2025-07-02", "2025-07-03"],
            "alice",
            "confirmed",
        )]);

        let updated = engine.remove_day("r5", "2025-07-02".parse().unwrap()).await.unwrap();
        let expected: Vec<NaiveDate> =
            vec!["2025-07-01".parse().unwrap(), "2025-07-03".parse().unwrap()];
        assert_eq!(updated.dates, expected);
        assert_eq!(store.lock().unwrap().get("r5").unwrap().dates, expected);
    }

    #[tokio::test]
    async fn remove_last_day_is_rejected() {
        let (engine, _repo, _store) =
            engine_with(vec![reservation("r6", "room 1", &["2025-07-01"], "alice", "pre")]);

        let err = engine.remove_day("r6", "2025-07-01".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, RoomSyncError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn remove_uncovered_day_is_rejected() {
        let (engine, _repo, _store) = engine_with(vec![reservation(
            "r6",
            "room 1",
            &["2025-07-01", "2025-07-02"],
            "alice",
            "pre",
        )]);

        let err = engine.remove_day("r6", "2025-08-01".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, RoomSyncError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_removes_local_copy() {
        let (engine, _repo, store) =
            engine_with(vec![reservation("r7", "room 2", &["2025-07-05"], "carol", "pre")]);

        engine.delete("r7").await.unwrap();
        assert!(store.lock().unwrap().get("r7").is_none());
    }

    #[tokio::test]
    async fn edit_notes_updates_record() {
        let (engine, _repo, store) =
            engine_with(vec![reservation("r8", "room 2", &["2025-07-06"], "carol", "pre")]);

        let updated =
            engine.edit_notes("r8", Some("call back".into()), None).await.unwrap();
        assert_eq!(updated.notes.as_deref(), Some("call back"));
        assert_eq!(
            store.lock().unwrap().get("r8").unwrap().notes.as_deref(),
            Some("call back")
        );
    }
}
