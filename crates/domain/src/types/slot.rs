//! Room identifiers and room+day slot keys

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Room identifier (e.g. "room 1").
///
/// The set of rooms is small and fixed server-side, but the client treats the
/// identifier as an opaque string so new rooms never require a release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Room(pub String);

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Room {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of a single calendar day in a single room.
///
/// Renders as `"{room}|{YYYY-MM-DD}"`, the key format shared by the occupancy
/// snapshot, the notified-days set, and server day-clear events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub room: Room,
    pub day: NaiveDate,
}

impl SlotKey {
    pub fn new(room: Room, day: NaiveDate) -> Self {
        Self { room, day }
    }

    /// `YYYY-MM-DD` rendering of the day component.
    pub fn day_key(&self) -> String {
        self.day.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.room, self.day.format("%Y-%m-%d"))
    }
}
