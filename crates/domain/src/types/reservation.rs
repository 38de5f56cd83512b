//! Reservation records and their status machine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::slot::{Room, SlotKey};

/// Lifecycle status of a reservation.
///
/// `Flagged` is a paid sub-state of `Confirmed`; both occupy their room+day
/// slots exclusively. Any number of `Pre` reservations may coexist on a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    Pre,
    Confirmed,
    Flagged,
}

impl ReservationStatus {
    /// Whether this status blocks other confirmed/flagged reservations on
    /// the same room+day.
    pub fn is_occupying(self) -> bool {
        matches!(self, Self::Confirmed | Self::Flagged)
    }
}

/// Category of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationType {
    Event,
    Assembly,
    Disassembly,
    Other,
}

/// A reservation as returned by the server.
///
/// `dates` is non-empty and fixed at creation; it only ever shrinks (a day
/// removed) or disappears entirely (reservation deleted).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub room: Room,
    pub dates: Vec<NaiveDate>,
    pub event: String,
    pub author: String,
    #[serde(rename = "type")]
    pub kind: ReservationType,
    /// Absent or `null` on the wire means `pre`; in memory the status is
    /// always concrete.
    #[serde(default, deserialize_with = "status_or_pre")]
    pub reservation_status: ReservationStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// The slot keys this reservation touches.
    pub fn slots(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.dates.iter().map(|day| SlotKey::new(self.room.clone(), *day))
    }

    /// Case-insensitive author comparison.
    pub fn authored_by(&self, username: &str) -> bool {
        self.author.eq_ignore_ascii_case(username)
    }

    pub fn is_occupying(&self) -> bool {
        self.reservation_status.is_occupying()
    }
}

fn status_or_pre<'de, D>(deserializer: D) -> Result<ReservationStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ReservationStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// Partial update payload for `PUT reservation/{id}`.
///
/// Only set fields are sent; trimming a day out of `dates` is the expected
/// use from this core.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}
