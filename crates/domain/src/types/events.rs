//! Audit history events and day-clear notifications

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::reservation::ReservationStatus;
use super::slot::{Room, SlotKey};

/// Kind of audit event recorded for a room+day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryAction {
    Created,
    StatusChanged,
    Deleted,
}

/// One entry of the room+day audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: HistoryAction,
    #[serde(default)]
    pub from_status: Option<ReservationStatus>,
    #[serde(default)]
    pub to_status: Option<ReservationStatus>,
    pub event: String,
}

/// Server-authoritative day-clear feed entry.
///
/// Persists server-side until explicitly consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayClearEvent {
    pub id: String,
    pub room: Room,
    pub day: NaiveDate,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl DayClearEvent {
    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.room.clone(), self.day)
    }
}

/// A day-clear notification presented to the user.
///
/// Either derived client-side by the detector or sourced from the server
/// feed; `server_event_id` is set in the latter case so dismissal can be
/// acknowledged remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayClearNotification {
    pub id: String,
    pub room: Room,
    pub day: NaiveDate,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub server_event_id: Option<String>,
}

impl DayClearNotification {
    /// Build a client-derived notification for a cleared slot.
    pub fn for_slot(slot: &SlotKey, created_at: DateTime<Utc>) -> Self {
        let message = format!(
            "{} is free again on {:02}/{:02}/{}",
            slot.room,
            chrono::Datelike::day(&slot.day),
            chrono::Datelike::month(&slot.day),
            chrono::Datelike::year(&slot.day),
        );
        Self {
            id: format!("{slot}@{}", created_at.timestamp_millis()),
            room: slot.room.clone(),
            day: slot.day,
            message,
            created_at,
            server_event_id: None,
        }
    }

    /// Adopt a server feed entry as a notification.
    pub fn from_server(event: DayClearEvent) -> Self {
        Self {
            id: event.id.clone(),
            room: event.room,
            day: event.day,
            message: event.message,
            created_at: event.created_at,
            server_event_id: Some(event.id),
        }
    }

    pub fn slot(&self) -> SlotKey {
        SlotKey::new(self.room.clone(), self.day)
    }

    /// Midnight-UTC ISO rendering of the cleared day.
    pub fn date_iso(&self) -> String {
        format!("{}T00:00:00.000Z", self.day.format("%Y-%m-%d"))
    }
}
