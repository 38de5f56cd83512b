//! Polling scheduler driving the four sweep cadences.
//!
//! Each cadence runs as its own background task over a shared
//! [`SyncService`]. The jittered loops draw a fresh sleep duration from
//! their window after every iteration so clients spread out instead of
//! polling in lockstep. Loop errors are logged and absorbed; the next
//! iteration retries.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, Utc};
use rand::Rng;
use roomsync_core::{CachePolicy, SyncService};
use roomsync_domain::types::range::{shift_month, year_month};
use roomsync_domain::{DateRange, SchedulerConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandles = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Cadence configuration for [`SweepScheduler`].
#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    /// Jitter window for the silent refresh of the viewed month.
    pub silent_refresh_min: Duration,
    pub silent_refresh_max: Duration,
    /// Fixed interval for the focused poll over blocked pre-reservations.
    pub focused_interval: Duration,
    /// Jitter window for the wide sweep around the current month.
    pub wide_sweep_min: Duration,
    pub wide_sweep_max: Duration,
    /// Jitter window for the horizon sweep.
    pub horizon_sweep_min: Duration,
    pub horizon_sweep_max: Duration,
    /// How far into the future the horizon sweep looks.
    pub horizon_span_years: i32,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for SweepSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            silent_refresh_min: Duration::from_secs(config.silent_refresh_min_seconds),
            silent_refresh_max: Duration::from_secs(config.silent_refresh_max_seconds),
            focused_interval: Duration::from_secs(config.focused_poll_seconds),
            wide_sweep_min: Duration::from_secs(config.wide_sweep_min_seconds),
            wide_sweep_max: Duration::from_secs(config.wide_sweep_max_seconds),
            horizon_sweep_min: Duration::from_secs(config.horizon_sweep_min_seconds),
            horizon_sweep_max: Duration::from_secs(config.horizon_sweep_max_seconds),
            horizon_span_years: config.horizon_span_years,
        }
    }
}

/// Scheduler owning the four polling loops.
pub struct SweepScheduler {
    service: Arc<SyncService>,
    config: SweepSchedulerConfig,
    cancellation_token: CancellationToken,
    task_handles: TaskHandles,
}

impl SweepScheduler {
    pub fn new(service: Arc<SyncService>, config: SweepSchedulerConfig) -> Self {
        Self {
            service,
            config,
            cancellation_token: CancellationToken::new(),
            task_handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start all polling loops.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if the loops are active.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!("Starting sweep scheduler");

        // A fresh token supports restart after stop.
        self.cancellation_token = CancellationToken::new();
        let mut handles = self.task_handles.lock().await;
        handles.clear();

        handles.push(tokio::spawn(Self::silent_refresh_loop(
            Arc::clone(&self.service),
            self.config.clone(),
            self.cancellation_token.clone(),
        )));
        handles.push(tokio::spawn(Self::focused_poll_loop(
            Arc::clone(&self.service),
            self.config.clone(),
            self.cancellation_token.clone(),
        )));
        handles.push(tokio::spawn(Self::wide_sweep_loop(
            Arc::clone(&self.service),
            self.config.clone(),
            self.cancellation_token.clone(),
        )));
        handles.push(tokio::spawn(Self::horizon_sweep_loop(
            Arc::clone(&self.service),
            self.config.clone(),
            self.cancellation_token.clone(),
        )));
        drop(handles);

        info!("Sweep scheduler started");
        Ok(())
    }

    /// Stop all loops gracefully.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotRunning`] if nothing is active.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping sweep scheduler");
        self.cancellation_token.cancel();

        let join_timeout = Duration::from_secs(5);
        let handles: Vec<_> = self.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("Sweep scheduler stopped");
        Ok(())
    }

    /// A scheduler is running if any of its task handles is still live.
    pub fn is_running(&self) -> bool {
        self.task_handles
            .try_lock()
            .map(|handles| handles.iter().any(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Uniform random duration from `[min, max)`; collapses to `min` when
    /// the window is empty.
    fn jitter(min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let millis = rand::thread_rng().gen_range(min.as_millis()..max.as_millis());
        Duration::from_millis(millis as u64)
    }

    /// Silent refresh: re-fetch the viewed month and merge the server-side
    /// day-clear feed on a jittered cadence.
    async fn silent_refresh_loop(
        service: Arc<SyncService>,
        config: SweepSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            let delay = Self::jitter(config.silent_refresh_min, config.silent_refresh_max);
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("silent refresh loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = service.refresh_viewed(CachePolicy::Default).await {
                        warn!(error = %e, "silent refresh failed");
                    }
                    if let Err(e) = service.pull_server_events().await {
                        warn!(error = %e, "day-clear feed pull failed");
                    }
                }
            }
        }
    }

    /// Focused poll: while the user has blocked pre-reservations, re-fetch
    /// the months containing them with the cache bypassed. Idle otherwise.
    async fn focused_poll_loop(
        service: Arc<SyncService>,
        config: SweepSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("focused poll loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.focused_interval) => {
                    let months: BTreeSet<(i32, u32)> = service
                        .blocked_pre_slots()
                        .iter()
                        .map(|slot| year_month(slot.day))
                        .collect();
                    if months.is_empty() {
                        continue;
                    }
                    debug!(months = months.len(), "focused poll over blocked months");
                    for (year, month) in months {
                        let Some(range) = DateRange::month(year, month) else { continue };
                        if let Err(e) = service.sweep(range, CachePolicy::Bypass).await {
                            warn!(error = %e, year, month, "focused poll sweep failed");
                        }
                    }
                }
            }
        }
    }

    /// Wide sweep: previous, current, and next calendar month as one range.
    /// Anchored on today's date, not on whichever month is on screen, so
    /// the window around the present stays covered during far navigation.
    async fn wide_sweep_loop(
        service: Arc<SyncService>,
        config: SweepSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            let delay = Self::jitter(config.wide_sweep_min, config.wide_sweep_max);
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("wide sweep loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    let today = Utc::now().date_naive();
                    let (year, month) = year_month(today);
                    let (py, pm) = shift_month(year, month, -1);
                    let (ny, nm) = shift_month(year, month, 1);
                    let range = match (DateRange::month(py, pm), DateRange::month(ny, nm)) {
                        (Some(prev), Some(next)) => DateRange::new(prev.start, next.end),
                        _ => continue,
                    };
                    if let Err(e) = service.sweep(range, CachePolicy::Default).await {
                        warn!(error = %e, "wide sweep failed");
                    }
                }
            }
        }
    }

    /// Horizon sweep: today through the configured number of years ahead.
    async fn horizon_sweep_loop(
        service: Arc<SyncService>,
        config: SweepSchedulerConfig,
        cancel: CancellationToken,
    ) {
        loop {
            let delay = Self::jitter(config.horizon_sweep_min, config.horizon_sweep_max);
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("horizon sweep loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    let today = Utc::now().date_naive();
                    let span_months = config.horizon_span_years.max(0) as u32 * 12;
                    let end = today
                        .checked_add_months(Months::new(span_months))
                        .unwrap_or(today);
                    let range = DateRange::new(today, end);
                    debug!(start = %range.start, end = %range.end, "horizon sweep");
                    if let Err(e) = service.sweep(range, CachePolicy::Default).await {
                        warn!(error = %e, "horizon sweep failed");
                    }
                }
            }
        }
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
