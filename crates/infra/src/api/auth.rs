//! API authentication.
//!
//! The reservation API expects a bearer token on every request. The trait
//! allows dependency injection and testing with mock providers.

use async_trait::async_trait;
use roomsync_domain::Result;

/// Trait for providing access tokens.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Get a valid access token. Implementations handle refresh if needed.
    async fn access_token(&self) -> Result<String>;
}

/// Fixed-token provider for deployments where the token is issued out of
/// band (and for tests).
pub struct StaticSession {
    token: String,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
