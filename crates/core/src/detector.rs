//! Day-clear detection across successive occupancy snapshots

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use roomsync_domain::{DayClearNotification, Reservation, SlotKey};
use tracing::debug;

use crate::occupancy::OccupancySnapshot;

/// Detects room+day slots transitioning from occupied to free.
///
/// One detector instance serves all fetch sources (month view, wide sweep,
/// horizon sweep, focused poll). The `notified` set is the single source of
/// truth preventing duplicate notifications across overlapping sweeps; it
/// grows monotonically for the session lifetime and is cleared only on
/// identity change.
#[derive(Debug)]
pub struct DayClearDetector {
    /// Viewing user, lowercased.
    user: String,
    previous: OccupancySnapshot,
    notified: HashSet<SlotKey>,
}

impl DayClearDetector {
    pub fn new(user: &str) -> Self {
        Self { user: user.to_lowercase(), previous: OccupancySnapshot::default(), notified: HashSet::new() }
    }

    /// Forget everything and start observing for a (possibly different) user.
    pub fn reset(&mut self, user: &str) {
        self.user = user.to_lowercase();
        self.previous = OccupancySnapshot::default();
        self.notified.clear();
    }

    /// Seed slots already notified elsewhere (e.g. server-sourced events) so
    /// the client-side diff never duplicates them.
    pub fn seed_notified(&mut self, slots: impl IntoIterator<Item = SlotKey>) {
        self.notified.extend(slots);
    }

    pub fn has_notified(&self, slot: &SlotKey) -> bool {
        self.notified.contains(slot)
    }

    /// Diff a freshly fetched reservation set against the previous snapshot.
    ///
    /// Emits at most one notification per slot per session, for slots where
    /// the viewing user holds a `pre` reservation and the occupying
    /// reservation went away - unless the user vacated it themselves.
    /// Idempotent under repeated identical input. The snapshot is fully
    /// replaced afterwards (not merged), and the notified-set update happens
    /// in the same pass as emission, so no interleaved pass can double-fire.
    pub fn observe(&mut self, reservations: &[Reservation]) -> Vec<DayClearNotification> {
        let current = OccupancySnapshot::build(reservations);

        // Slots where the viewing user holds a pre (or status-less) record.
        let user_pre_slots: BTreeSet<SlotKey> = reservations
            .iter()
            .filter(|r| !r.is_occupying() && r.authored_by(&self.user))
            .flat_map(Reservation::slots)
            .collect();

        let now = Utc::now();
        let mut notifications = Vec::new();

        for slot in &user_pre_slots {
            if !self.previous.is_occupied(slot)
                || current.is_occupied(slot)
                || self.notified.contains(slot)
            {
                continue;
            }

            // The user freed their own reservation; nothing to announce.
            let self_vacated =
                self.previous.authors(slot).is_some_and(|authors| authors.contains(&self.user));
            if self_vacated {
                debug!(slot = %slot, "day clear skipped: vacated by viewing user");
                continue;
            }

            debug!(slot = %slot, "day cleared");
            notifications.push(DayClearNotification::for_slot(slot, now));
            self.notified.insert(slot.clone());
        }

        self.previous = current;
        notifications
    }
}
