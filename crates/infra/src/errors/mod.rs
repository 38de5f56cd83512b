//! Conversions from external infrastructure errors into domain errors.

use reqwest::{Error as HttpError, StatusCode};
use roomsync_domain::RoomSyncError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RoomSyncError);

impl From<InfraError> for RoomSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RoomSyncError> for InfraError {
    fn from(value: RoomSyncError) -> Self {
        Self(value)
    }
}

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            return Self(RoomSyncError::Network(format!("request timed out: {message}")));
        }
        if err.is_connect() {
            return Self(RoomSyncError::Network(format!("connection failed: {message}")));
        }
        if err.is_decode() {
            return Self(RoomSyncError::Internal(format!("malformed response body: {message}")));
        }
        Self(RoomSyncError::Network(message))
    }
}

/// Map a non-success HTTP status to the domain error the callers branch on.
/// 409 and 429 have dedicated variants; other client errors are the caller's
/// fault, server errors are transport failures.
pub fn status_to_error(status: StatusCode, url: &str, body: &str) -> RoomSyncError {
    let detail = if body.is_empty() { String::new() } else { format!(": {body}") };
    match status {
        StatusCode::CONFLICT => RoomSyncError::Conflict(format!("{url}{detail}")),
        StatusCode::TOO_MANY_REQUESTS => RoomSyncError::RateLimited(format!("{url}{detail}")),
        StatusCode::NOT_FOUND => RoomSyncError::NotFound(url.to_string()),
        s if s.is_client_error() => {
            RoomSyncError::InvalidInput(format!("{s} from {url}{detail}"))
        }
        s => RoomSyncError::Network(format!("{s} from {url}{detail}")),
    }
}
