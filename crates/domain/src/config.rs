//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub scheduler: SchedulerConfig,
}

/// Reservation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the reservation REST API (e.g. "https://example.com/api")
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Read-cache configuration for range fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub max_ranges: u64,
}

/// Cadences for the polling/sweep loops.
///
/// `*_min`/`*_max` pairs describe half-open jitter windows `[min, max)`;
/// each loop sleeps for a fresh random duration from its window after every
/// completed iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub focused_poll_seconds: u64,
    pub silent_refresh_min_seconds: u64,
    pub silent_refresh_max_seconds: u64,
    pub wide_sweep_min_seconds: u64,
    pub wide_sweep_max_seconds: u64,
    pub horizon_sweep_min_seconds: u64,
    pub horizon_sweep_max_seconds: u64,
    pub horizon_span_years: i32,
    /// Widest date span the server accepts for a single range query.
    pub max_range_days: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: "/api".to_string(), timeout_seconds: 30 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: constants::FETCH_CACHE_TTL_SECS,
            max_ranges: constants::FETCH_CACHE_MAX_RANGES,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            focused_poll_seconds: constants::FOCUSED_POLL_INTERVAL_SECS,
            silent_refresh_min_seconds: constants::SILENT_REFRESH_MIN_SECS,
            silent_refresh_max_seconds: constants::SILENT_REFRESH_MAX_SECS,
            wide_sweep_min_seconds: constants::WIDE_SWEEP_MIN_SECS,
            wide_sweep_max_seconds: constants::WIDE_SWEEP_MAX_SECS,
            horizon_sweep_min_seconds: constants::HORIZON_SWEEP_MIN_SECS,
            horizon_sweep_max_seconds: constants::HORIZON_SWEEP_MAX_SECS,
            horizon_span_years: constants::HORIZON_SPAN_YEARS,
            max_range_days: constants::MAX_RANGE_DAYS,
        }
    }
}
