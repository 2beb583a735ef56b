// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use toml::Table;

use crate::{Daemon, DaemonError, StateError};

/// The `base` kind: no hardware, and a state table kept exactly as given.
#[derive(Debug, Default)]
pub struct BaseDaemon {
    state: Table,
}

impl Daemon for BaseDaemon {
    const KIND: &'static str = "base";
    const DESCRIPTION: &'static str =
        "Generic yaq daemon. Exposes the shared RPC surface and persists any state it is given.";

    fn new(_config: &Table) -> Result<Self, DaemonError> {
        Ok(Self::default())
    }

    fn get_state(&self) -> Table {
        self.state.clone()
    }

    fn load_state(&mut self, state: Table) -> Result<(), StateError> {
        self.state = state;
        Ok(())
    }
}
