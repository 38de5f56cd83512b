//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Repository client configuration
pub const FETCH_CACHE_TTL_SECS: u64 = 30;
pub const FETCH_CACHE_MAX_RANGES: u64 = 256;
pub const RATE_LIMIT_MAX_ATTEMPTS: usize = 3;
pub const RATE_LIMIT_BASE_BACKOFF_MS: u64 = 500;
pub const RATE_LIMIT_MAX_JITTER_MS: u64 = 250;

// Polling/sweep cadences. Randomized windows are half-open: [min, max).
pub const FOCUSED_POLL_INTERVAL_SECS: u64 = 60;
pub const SILENT_REFRESH_MIN_SECS: u64 = 5 * 60;
pub const SILENT_REFRESH_MAX_SECS: u64 = 10 * 60;
pub const WIDE_SWEEP_MIN_SECS: u64 = 12 * 60;
pub const WIDE_SWEEP_MAX_SECS: u64 = 15 * 60;
pub const HORIZON_SWEEP_MIN_SECS: u64 = 6 * 60 * 60;
pub const HORIZON_SWEEP_MAX_SECS: u64 = 7 * 60 * 60;

// Horizon sweep scope: today out to this many years ahead, fetched in
// contiguous chunks no wider than the server's per-request range guard.
pub const HORIZON_SPAN_YEARS: i32 = 5;
pub const MAX_RANGE_DAYS: u32 = 366;
