//! Optimistic in-memory copy of fetched reservations

use std::collections::{BTreeSet, HashMap};

use roomsync_domain::{DateRange, Reservation, ReservationStatus, SlotKey};

use crate::occupancy::OccupancySnapshot;

/// Client-side reservation list, keyed by id.
///
/// Holds the most recently fetched server state plus any optimistic local
/// edits pending confirmation. The server stays the source of truth: every
/// mutation is followed by a bypass re-fetch that lands here through
/// [`ReservationStore::apply_range`].
#[derive(Debug, Default)]
pub struct ReservationStore {
    inner: HashMap<String, Reservation>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile a fetched range: records intersecting the range are
    /// replaced wholesale, so reservations the server no longer returns
    /// (deleted, or trimmed out of the range) disappear locally too.
    pub fn apply_range(&mut self, range: DateRange, fetched: Vec<Reservation>) {
        self.inner.retain(|_, existing| !existing.dates.iter().any(|day| range.contains(*day)));
        for reservation in fetched {
            self.inner.insert(reservation.id.clone(), reservation);
        }
    }

    pub fn apply_one(&mut self, reservation: Reservation) {
        self.inner.insert(reservation.id.clone(), reservation);
    }

    pub fn remove(&mut self, id: &str) -> Option<Reservation> {
        self.inner.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Reservation> {
        self.inner.get(id)
    }

    /// Set a reservation's status, returning the previous status so a failed
    /// server confirmation can roll the edit back.
    pub fn set_status(&mut self, id: &str, status: ReservationStatus) -> Option<ReservationStatus> {
        self.inner.get_mut(id).map(|reservation| {
            let previous = reservation.reservation_status;
            reservation.reservation_status = status;
            previous
        })
    }

    pub fn all(&self) -> Vec<Reservation> {
        self.inner.values().cloned().collect()
    }

    pub fn for_slot(&self, slot: &SlotKey) -> Vec<Reservation> {
        self.inner
            .values()
            .filter(|reservation| reservation.slots().any(|candidate| candidate == *slot))
            .cloned()
            .collect()
    }

    /// Slots where `user` holds a pre-reservation that is currently blocked
    /// by someone else's occupying reservation. A non-empty result is what
    /// keeps the focused rapid poll alive.
    pub fn blocked_pre_slots(&self, user: &str) -> BTreeSet<SlotKey> {
        let reservations = self.all();
        let snapshot = OccupancySnapshot::build(&reservations);
        let user_lower = user.to_lowercase();

        reservations
            .iter()
            .filter(|r| !r.is_occupying() && r.authored_by(user))
            .flat_map(Reservation::slots)
            .filter(|slot| {
                snapshot.authors(slot).is_some_and(|authors| {
                    authors.iter().any(|author| *author != user_lower)
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
