// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use yaqd_storage::StoreError;

use crate::config::ConfigError;
use crate::daemon::StateError;

/// Daemon construction and lifecycle errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Could not determine {0} directory")]
    NoDir(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Daemon '{0}' is already running")]
    Duplicate(String),

    #[error("Invalid state: {0}")]
    InvalidState(#[from] StateError),

    #[error("Failed to save state: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
