// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Busy flag with waitable transitions.

use tokio::sync::watch;

/// A boolean "busy" flag that tasks can wait on.
///
/// Setting the value it already holds is not a transition: no waiter is
/// woken and [`BusySignal::set`] reports `false`.
#[derive(Debug)]
pub struct BusySignal {
    tx: watch::Sender<bool>,
}

impl Default for BusySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl BusySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns true when this call changed the value.
    pub fn set(&self, busy: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == busy {
                return false;
            }
            *current = busy;
            true
        })
    }

    /// Resolve once the daemon is busy (immediately if it already is).
    pub async fn wait_busy(&self) {
        self.wait_for(true).await
    }

    /// Resolve once the daemon is idle (immediately if it already is).
    pub async fn wait_not_busy(&self) {
        self.wait_for(false).await
    }

    async fn wait_for(&self, target: bool) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close while we wait.
        let _ = rx.wait_for(|busy| *busy == target).await;
    }

    /// A receiver that observes every transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
#[path = "busy_tests.rs"]
mod tests;
