//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for RoomSync
///
/// Errors are `Clone` because fetch results are shared between coalesced
/// in-flight callers, each of which receives its own copy of the outcome.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum RoomSyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Occupancy conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomSyncError {
    /// Whether this error is the recoverable double-booking outcome
    /// (HTTP 409 on a status change).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type alias for RoomSync operations
pub type Result<T> = std::result::Result<T, RoomSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_detection() {
        assert!(RoomSyncError::Conflict("slot taken".into()).is_conflict());
        assert!(!RoomSyncError::Network("down".into()).is_conflict());
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = RoomSyncError::RateLimited("slow down".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "RateLimited");
        assert_eq!(json["message"], "slow down");
    }
}
