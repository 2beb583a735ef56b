// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file.
//!
//! Each top-level table is one daemon instance, named by its key. The
//! reserved `shared-settings` table is merged beneath every instance, and
//! an `enable = false` key (top level or per instance) turns units off.

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::Table;

/// Section merged beneath every instance section.
pub const SHARED_SETTINGS: &str = "shared-settings";

/// Host used when a section does not set one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("No section named '{0}' in config")]
    MissingSection(String),

    #[error("Section '{0}' is not a table")]
    NotATable(String),

    #[error("Section '{section}' has no valid '{key}': {reason}")]
    InvalidKey { section: String, key: &'static str, reason: String },
}

/// A parsed configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    table: Table,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let table = text
            .parse::<Table>()
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), table })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False when the top-level `enable` key turns the whole file off.
    pub fn enabled(&self) -> bool {
        is_enabled(&self.table)
    }

    /// Names of the daemon instance sections.
    pub fn sections(&self) -> Vec<&str> {
        self.table
            .iter()
            .filter(|(name, value)| name.as_str() != SHARED_SETTINGS && value.is_table())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Merge `defaults`, `shared-settings`, and the named section, in that
    /// order. Returns `None` when the merged section is disabled.
    pub fn section_config(&self, name: &str, defaults: Table) -> Result<Option<Table>, ConfigError> {
        let section = match self.table.get(name) {
            Some(toml::Value::Table(section)) if name != SHARED_SETTINGS => section,
            Some(_) => return Err(ConfigError::NotATable(name.to_string())),
            None => return Err(ConfigError::MissingSection(name.to_string())),
        };

        let mut config = defaults;
        if let Some(toml::Value::Table(shared)) = self.table.get(SHARED_SETTINGS) {
            config.extend(shared.clone());
        }
        config.extend(section.clone());

        if !is_enabled(&config) {
            return Ok(None);
        }
        config.remove("enable");
        Ok(Some(config))
    }
}

fn is_enabled(table: &Table) -> bool {
    table.get("enable").and_then(toml::Value::as_bool).unwrap_or(true)
}

/// `host:port` to listen on for a merged section.
pub fn bind_addr(name: &str, config: &Table) -> Result<(String, u16), ConfigError> {
    let invalid = |key, reason: &str| ConfigError::InvalidKey {
        section: name.to_string(),
        key,
        reason: reason.to_string(),
    };

    let port = match config.get("port") {
        Some(toml::Value::Integer(port)) => {
            u16::try_from(*port).map_err(|_| invalid("port", "out of range"))?
        }
        Some(_) => return Err(invalid("port", "expected an integer")),
        None => return Err(invalid("port", "missing")),
    };
    let host = match config.get("host") {
        Some(toml::Value::String(host)) => host.clone(),
        Some(_) => return Err(invalid("host", "expected a string")),
        None => DEFAULT_HOST.to_string(),
    };
    Ok((host, port))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
