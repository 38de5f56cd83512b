//! Notification center for day-clear events

use std::collections::HashSet;

use roomsync_domain::{DayClearNotification, SlotKey};
use tracing::debug;

/// Live list of day-clear notifications shown to the user.
///
/// Fed by both the client-side detector and the server event feed; at most
/// one entry per room+day slot per session, whichever source observes the
/// clearing first. Entries stay until explicitly consumed. Also carries the
/// one-shot "open day X in room Y" navigation request.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    items: Vec<DayClearNotification>,
    /// Slots that produced an entry this session; monotonic, so a consumed
    /// notification is not re-surfaced by the other source.
    seen: HashSet<SlotKey>,
    open_request: Option<SlotKey>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notification unless its slot already produced one this session.
    /// Returns whether the notification was accepted.
    pub fn add(&mut self, notification: DayClearNotification) -> bool {
        let slot = notification.slot();
        if !self.seen.insert(slot.clone()) {
            debug!(slot = %slot, "notification suppressed: slot already announced");
            return false;
        }
        self.items.push(notification);
        true
    }

    pub fn items(&self) -> Vec<DayClearNotification> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dismiss one notification. Returns the server event id to acknowledge
    /// remotely, if the entry came from the server feed; `None` when the id
    /// is unknown or the entry was client-derived.
    pub fn consume(&mut self, id: &str) -> Option<Option<String>> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let removed = self.items.remove(index);
        Some(removed.server_event_id)
    }

    /// Dismiss everything, returning the server event ids that need remote
    /// acknowledgement.
    pub fn consume_all(&mut self) -> Vec<String> {
        self.items.drain(..).filter_map(|item| item.server_event_id).collect()
    }

    /// Record a request to navigate the calendar to a slot.
    pub fn request_open(&mut self, slot: SlotKey) {
        self.open_request = Some(slot);
    }

    /// Hand the pending navigation request to the calendar, at most once.
    pub fn take_open_request(&mut self) -> Option<SlotKey> {
        self.open_request.take()
    }

    /// Forget everything; used on logout or identity change.
    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.open_request = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use roomsync_domain::{DayClearEvent, Room};

    use super::*;

    fn slot(room: &str, day: &str) -> SlotKey {
        SlotKey::new(Room::from(room), day.parse().unwrap())
    }

    fn client_note(room: &str, day: &str) -> DayClearNotification {
        DayClearNotification::for_slot(&slot(room, day), Utc::now())
    }

    fn server_note(id: &str, room: &str, day: &str) -> DayClearNotification {
        DayClearNotification::from_server(DayClearEvent {
            id: id.into(),
            room: Room::from(room),
            day: day.parse().unwrap(),
            message: "cleared".into(),
            created_at: Utc::now(),
        })
    }

    #[test]
    fn one_entry_per_slot_across_sources() {
        let mut center = NotificationCenter::new();
        assert!(center.add(client_note("room 1", "2025-06-10")));
        // Server feed reports the same clearing.
        assert!(!center.add(server_note("evt-1", "room 1", "2025-06-10")));
        assert_eq!(center.len(), 1);
    }

    #[test]
    fn consume_returns_server_id_for_acknowledgement() {
        let mut center = NotificationCenter::new();
        center.add(server_note("evt-2", "room 2", "2025-06-11"));

        let ack = center.consume("evt-2");
        assert_eq!(ack, Some(Some("evt-2".into())));
        assert!(center.is_empty());
        assert!(center.consume("evt-2").is_none());
    }

    #[test]
    fn consume_all_collects_only_server_ids() {
        let mut center = NotificationCenter::new();
        center.add(client_note("room 1", "2025-06-10"));
        center.add(server_note("evt-3", "room 2", "2025-06-11"));

        let acks = center.consume_all();
        assert_eq!(acks, vec!["evt-3".to_string()]);
        assert!(center.is_empty());
    }

    #[test]
    fn consumed_slot_is_not_reannounced() {
        let mut center = NotificationCenter::new();
        center.add(client_note("room 1", "2025-06-10"));
        center.consume_all();
        assert!(!center.add(client_note("room 1", "2025-06-10")));
    }

    #[test]
    fn open_request_is_one_shot() {
        let mut center = NotificationCenter::new();
        center.request_open(slot("room 1", "2025-06-10"));
        assert_eq!(center.take_open_request(), Some(slot("room 1", "2025-06-10")));
        assert!(center.take_open_request().is_none());
    }

    #[test]
    fn clear_resets_seen_set() {
        let mut center = NotificationCenter::new();
        center.add(client_note("room 1", "2025-06-10"));
        center.clear();
        assert!(center.is_empty());
        assert!(center.add(client_note("room 1", "2025-06-10")));
    }
}
