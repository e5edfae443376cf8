//! Utility functions shared across the codebase

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current time in milliseconds since Unix epoch
/// Returns 0 if system time is before Unix epoch (fallback behavior)
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

/// Durations as fractional seconds, the unit the report uses.
pub fn as_secs(durations: &[Duration]) -> Vec<f64> {
    durations.iter().map(Duration::as_secs_f64).collect()
}
