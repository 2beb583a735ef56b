// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use thiserror::Error;
use toml::Table;

use crate::{Context, DaemonError, Method};

/// A state table was rejected by [`Daemon::load_state`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StateError(pub String);

/// Hooks a daemon kind implements.
///
/// The runtime owns one value of the implementing type per configured
/// instance and drives it from a single task at a time: hooks are never
/// called concurrently for the same instance.
#[async_trait]
pub trait Daemon: Sized + Send + 'static {
    /// Type tag shared by every instance of this kind.
    const KIND: &'static str;

    /// Daemon-level text returned by `help` with no arguments.
    const DESCRIPTION: &'static str = "";

    /// Defaults merged beneath `shared-settings` and the instance section.
    fn defaults() -> Table {
        Table::new()
    }

    /// Build an instance from its merged config.
    fn new(config: &Table) -> Result<Self, DaemonError>;

    /// Current runtime state, as persisted and returned by `get_state`.
    fn get_state(&self) -> Table;

    /// Validate and adopt a complete state table.
    ///
    /// Called at startup with whatever the state file held (possibly an
    /// empty table) and by `set_state` with the merged result. Fields absent
    /// from `state` should take their defaults.
    fn load_state(&mut self, state: Table) -> Result<(), StateError>;

    /// Keep the runtime state fresh. Runs as a background task until the
    /// daemon shuts down; the default has nothing to refresh.
    async fn update_state(_ctx: Context<Self>) {}

    /// Release resources. Runs once, after background tasks have stopped.
    fn close(&mut self) {}

    /// Kind-specific RPC methods, added to the shared surface. A method
    /// with the same name as a shared one replaces it.
    fn methods() -> Vec<Method<Self>> {
        Vec::new()
    }
}
