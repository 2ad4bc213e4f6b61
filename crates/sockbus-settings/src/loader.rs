//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If the file named by `SOCKBUS_CONFIG` exists, deep-merge its
//!    values over the defaults
//! 3. Apply `SOCKBUS_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::Settings;

/// Load settings from the path named by `SOCKBUS_CONFIG` (if any) with
/// env var overrides.
pub fn load_settings() -> Result<Settings> {
    match std::env::var("SOCKBUS_CONFIG") {
        Ok(path) => load_settings_from_path(Path::new(&path)),
        Err(_) => {
            let mut settings = Settings::default();
            apply_env_overrides(&mut settings);
            Ok(settings)
        }
    }
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: Settings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each env var has strict parsing rules; invalid values are silently
/// ignored (falling back to the file value or default).
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Some(v) = read_env_string("SOCKBUS_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("SOCKBUS_PORT") {
        settings.server.port = v;
    }
    if let Some(v) = read_env_u64("SOCKBUS_GRACEFUL_TIMEOUT_MS", 0, 600_000) {
        settings.server.graceful_timeout_ms = v;
    }

    if let Some(v) = read_env_u64("SOCKBUS_PING_INTERVAL_MS", 100, 600_000) {
        settings.socket.ping_interval_ms = v;
    }
    if let Some(v) = read_env_u64("SOCKBUS_PONG_WAIT_MS", 100, 600_000) {
        settings.socket.pong_wait_ms = v;
    }
    if let Some(v) = read_env_u64("SOCKBUS_WRITE_WAIT_MS", 100, 600_000) {
        settings.socket.write_wait_ms = v;
    }
    if let Some(v) = read_env_usize("SOCKBUS_READ_LIMIT_BYTES", 1, 16_777_216) {
        settings.socket.read_limit_bytes = v;
    }
    if let Some(v) = read_env_usize("SOCKBUS_SEND_QUEUE", 1, 65_536) {
        settings.socket.send_queue = v;
    }

    if let Some(v) = read_env_string("SOCKBUS_BUS_DRIVER") {
        if let Ok(kind) = v.parse() {
            settings.bus.driver = kind;
        }
    }
    if let Some(v) = read_env_string("SOCKBUS_REDIS_URL") {
        settings.bus.redis_url = v;
    }
    if let Some(v) = read_env_string("SOCKBUS_NATS_URL") {
        settings.bus.nats_url = v;
    }
    if let Some(v) = read_env_usize("SOCKBUS_DELIVERY_BUFFER", 1, 65_536) {
        settings.bus.delivery_buffer = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok()?.parse().ok()
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    parse_u64_range(&std::env::var(name).ok()?, min, max)
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    parse_usize_range(&std::env::var(name).ok()?, min, max)
}
