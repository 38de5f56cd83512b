//! Top-level synchronization engine.
//!
//! Owns the wired [`SyncService`] and its [`SweepScheduler`]. Hosts build
//! one engine per authenticated session and drive everything through it.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use roomsync_core::{ReservationRepository, SyncService};
use roomsync_domain::{Config, Result};
use tracing::{info, warn};

use crate::api::{ReservationApiClient, ReservationApiConfig, SessionProvider};
use crate::scheduling::{SweepScheduler, SweepSchedulerConfig};

/// Reservation sync engine: API client + service + polling scheduler.
pub struct SyncEngine {
    service: Arc<SyncService>,
    scheduler: SweepScheduler,
}

impl SyncEngine {
    /// Wire an engine from configuration for the given user.
    pub fn new(config: &Config, session: Arc<dyn SessionProvider>, user: &str) -> Result<Self> {
        let client =
            ReservationApiClient::new(ReservationApiConfig::from_config(config), session)?;
        Self::with_repository(Arc::new(client), config, user)
    }

    /// Wire an engine over an existing repository implementation.
    pub fn with_repository(
        repo: Arc<dyn ReservationRepository>,
        config: &Config,
        user: &str,
    ) -> Result<Self> {
        let service = Arc::new(SyncService::new(repo, user, config.scheduler.max_range_days));
        let scheduler = SweepScheduler::new(
            Arc::clone(&service),
            SweepSchedulerConfig::from(&config.scheduler),
        );
        Ok(Self { service, scheduler })
    }

    /// The service, for issuing user-facing operations.
    pub fn service(&self) -> Arc<SyncService> {
        Arc::clone(&self.service)
    }

    /// Prime the session (current month plus the server day-clear feed) and
    /// start the polling loops. Priming failures are absorbed; the loops
    /// catch up on the next tick.
    pub async fn start(&mut self) -> Result<()> {
        let today = Utc::now().date_naive();
        if let Err(e) = self.service.view_month(today.year(), today.month()).await {
            warn!(error = %e, "initial month fetch failed");
        }
        if let Err(e) = self.service.pull_server_events().await {
            warn!(error = %e, "initial day-clear feed pull failed");
        }

        self.scheduler.start().await?;
        info!(user = %self.service.user(), "sync engine started");
        Ok(())
    }

    /// Stop the polling loops.
    pub async fn stop(&mut self) -> Result<()> {
        self.scheduler.stop().await?;
        info!("sync engine stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Switch identity; the service clears all per-user state when the name
    /// actually changes.
    pub fn set_user(&self, user: &str) {
        self.service.set_user(user);
    }

    /// Drop caches and derived state, forcing fresh fetches.
    pub fn invalidate(&self) {
        self.service.invalidate();
    }
}
