//! Occupancy snapshot derived from a fetched reservation set

use std::collections::{HashMap, HashSet};

use roomsync_domain::{Reservation, SlotKey};

/// Derived, ephemeral view of which room+day slots are occupied and by whom.
///
/// A slot is occupied iff some reservation with an occupying status
/// (`confirmed` or `flagged`) covers it; `pre` records never contribute.
/// Author names are stored lowercased so comparisons stay case-insensitive.
/// Rebuilt from scratch on every fetch and never persisted.
#[derive(Debug, Clone, Default)]
pub struct OccupancySnapshot {
    occupied: HashSet<SlotKey>,
    occupying_authors: HashMap<SlotKey, HashSet<String>>,
}

impl OccupancySnapshot {
    /// Derive the snapshot for a reservation set. Total: malformed or empty
    /// input simply yields an empty snapshot.
    pub fn build(reservations: &[Reservation]) -> Self {
        let mut snapshot = Self::default();
        for reservation in reservations {
            if !reservation.is_occupying() {
                continue;
            }
            for slot in reservation.slots() {
                snapshot
                    .occupying_authors
                    .entry(slot.clone())
                    .or_default()
                    .insert(reservation.author.to_lowercase());
                snapshot.occupied.insert(slot);
            }
        }
        snapshot
    }

    pub fn is_occupied(&self, slot: &SlotKey) -> bool {
        self.occupied.contains(slot)
    }

    /// Lowercased usernames of the occupying reservations on `slot`.
    pub fn authors(&self, slot: &SlotKey) -> Option<&HashSet<String>> {
        self.occupying_authors.get(slot)
    }

    pub fn occupied_slots(&self) -> impl Iterator<Item = &SlotKey> {
        self.occupied.iter()
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }
}
