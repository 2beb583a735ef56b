// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted daemon state.
//!
//! One TOML table per `(kind, name)` pair, holding exactly what the daemon
//! reports from `get_state`. Loading never fails: a missing or unreadable
//! file yields an empty table so a bad file cannot keep a daemon down.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::Table;
use tracing::{debug, warn};

/// Errors from writing the state file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state is not representable as TOML: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Result of reading the state file.
#[derive(Debug, Clone, PartialEq)]
pub enum StateLoad {
    Loaded(Table),
    /// No state file yet (first run).
    Missing,
    /// The file exists but could not be read or parsed.
    Unreadable(String),
}

impl StateLoad {
    /// The loaded table, or an empty one.
    pub fn into_table(self) -> Table {
        match self {
            StateLoad::Loaded(table) => table,
            StateLoad::Missing | StateLoad::Unreadable(_) => Table::new(),
        }
    }
}

/// `<root>/<kind>/<name>-state.toml`
pub fn state_file_path(root: &Path, kind: &str, name: &str) -> PathBuf {
    root.join(kind).join(format!("{name}-state.toml"))
}

/// Reads and writes one daemon's state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store for a daemon under the given state root.
    pub fn for_daemon(root: &Path, kind: &str, name: &str) -> Self {
        Self::new(state_file_path(root, kind, name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> StateLoad {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file");
                return StateLoad::Missing;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read state file");
                return StateLoad::Unreadable(e.to_string());
            }
        };

        match text.parse::<Table>() {
            Ok(table) => StateLoad::Loaded(table),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to parse state file");
                StateLoad::Unreadable(e.to_string())
            }
        }
    }

    /// Overwrite the state file with `state`.
    ///
    /// Writes a sibling temp file and renames it into place, so a crash
    /// mid-write loses the update but leaves the previous file intact.
    pub fn save(&self, state: &Table) -> Result<(), StoreError> {
        let text = toml::to_string(state)?;
        let tmp_path = self.path.with_extension("toml.tmp");

        let io_err = |source| StoreError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&tmp_path, text.as_bytes()).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
