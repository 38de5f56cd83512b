//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ROOMSYNC_API_BASE_URL`: Reservation API base URL (required for env loading)
//! - `ROOMSYNC_API_TIMEOUT`: Request timeout in seconds
//! - `ROOMSYNC_CACHE_TTL`: Fetch cache TTL in seconds
//! - `ROOMSYNC_CACHE_MAX_RANGES`: Maximum cached date ranges
//! - `ROOMSYNC_FOCUSED_POLL_SECONDS`: Focused poll interval in seconds
//! - `ROOMSYNC_HORIZON_SPAN_YEARS`: Horizon sweep span in years
//! - `ROOMSYNC_MAX_RANGE_DAYS`: Widest span per range request in days
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./roomsync.json` or `./roomsync.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)

use std::path::{Path, PathBuf};

use roomsync_domain::{Config, Result, RoomSyncError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `RoomSyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `ROOMSYNC_API_BASE_URL` must be present; the remaining variables overlay
/// the defaults.
///
/// # Errors
/// Returns `RoomSyncError::Config` if the base URL is missing or any present
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.api.base_url = env_var("ROOMSYNC_API_BASE_URL")?;

    if let Some(timeout) = env_parse::<u64>("ROOMSYNC_API_TIMEOUT")? {
        config.api.timeout_seconds = timeout;
    }
    if let Some(ttl) = env_parse::<u64>("ROOMSYNC_CACHE_TTL")? {
        config.cache.ttl_seconds = ttl;
    }
    if let Some(max_ranges) = env_parse::<u64>("ROOMSYNC_CACHE_MAX_RANGES")? {
        config.cache.max_ranges = max_ranges;
    }
    if let Some(focused) = env_parse::<u64>("ROOMSYNC_FOCUSED_POLL_SECONDS")? {
        config.scheduler.focused_poll_seconds = focused;
    }
    if let Some(span) = env_parse::<i32>("ROOMSYNC_HORIZON_SPAN_YEARS")? {
        config.scheduler.horizon_span_years = span;
    }
    if let Some(max_days) = env_parse::<u32>("ROOMSYNC_MAX_RANGE_DAYS")? {
        config.scheduler.max_range_days = max_days;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `RoomSyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RoomSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RoomSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RoomSyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format detected by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| RoomSyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| RoomSyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(RoomSyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe standard paths for configuration files, first hit wins.
fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("roomsync.json"),
            cwd.join("roomsync.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
        ]);
    }

    candidates.into_iter().find(|p| p.exists())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| RoomSyncError::Config(format!("Missing environment variable: {name}")))
}

/// Parse an optional environment variable; absent is `Ok(None)`, present but
/// unparsable is an error.
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| RoomSyncError::Config(format!("Invalid value for {name}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://rooms.example.com/api\"\ntimeout_seconds = 10\n\n[cache]\nttl_seconds = 15\n"
        )
        .unwrap();

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.api.base_url, "https://rooms.example.com/api");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.cache.ttl_seconds, 15);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.scheduler.focused_poll_seconds, 60);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api": {"base_url": "/api"}, "scheduler": {"horizon_span_years": 2}}"#,
        )
        .unwrap();

        let config = load_from_file(Some(path)).unwrap();
        assert_eq!(config.api.base_url, "/api");
        assert_eq!(config.scheduler.horizon_span_years, 2);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/config.json"))).unwrap_err();
        assert!(matches!(err, RoomSyncError::Config(_)));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api: {}").unwrap();

        let err = load_from_file(Some(path)).unwrap_err();
        assert!(matches!(err, RoomSyncError::Config(_)));
    }
}
