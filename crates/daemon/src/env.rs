// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::DaemonError;

/// Filter directives for the log subscriber (e.g. `debug`, `yaqd_daemon=trace`).
pub const LOG_ENV: &str = "YAQD_LOG";

/// Resolve state root: YAQD_STATE_DIR > <data dir>/yaqd-state
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("YAQD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let data = dirs::data_dir().ok_or(DaemonError::NoDir("data"))?;
    Ok(data.join("yaqd-state"))
}

/// Resolve config file: YAQD_CONFIG > <config dir>/yaqd-<kind>/config.toml
pub fn config_path(kind: &str) -> Result<PathBuf, DaemonError> {
    if let Ok(path) = std::env::var("YAQD_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let config = dirs::config_dir().ok_or(DaemonError::NoDir("config"))?;
    Ok(config.join(format!("yaqd-{kind}")).join("config.toml"))
}

/// How often state is written while a daemon is busy (default 100ms,
/// configurable via `YAQD_SAVE_INTERVAL_MS`).
pub fn save_interval() -> Duration {
    std::env::var("YAQD_SAVE_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(100))
}
