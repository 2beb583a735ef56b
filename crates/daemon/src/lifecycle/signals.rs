// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process signals that end or restart the whole supervisor.

use tracing::info;

use super::Exit;

#[cfg(unix)]
pub(crate) struct Signals {
    hup: tokio::signal::unix::Signal,
    term: tokio::signal::unix::Signal,
    int: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            hup: signal(SignalKind::hangup())?,
            term: signal(SignalKind::terminate())?,
            int: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next signal: SIGHUP restarts, SIGTERM and SIGINT stop.
    pub async fn recv(&mut self) -> Exit {
        tokio::select! {
            _ = self.hup.recv() => {
                info!("received SIGHUP");
                Exit::Restart
            }
            _ = self.term.recv() => {
                info!("received SIGTERM");
                Exit::Stop
            }
            _ = self.int.recv() => {
                info!("received SIGINT");
                Exit::Stop
            }
        }
    }
}

/// No signal handlers off unix; only the `shutdown` method ends daemons.
#[cfg(not(unix))]
pub(crate) struct Signals;

#[cfg(not(unix))]
impl Signals {
    pub fn install() -> std::io::Result<Self> {
        info!("signal handling unavailable on this platform");
        Ok(Self)
    }

    pub async fn recv(&mut self) -> Exit {
        std::future::pending().await
    }
}
