// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, restart.
//!
//! A [`Supervisor`] owns every instance configured in one file. Instances
//! stop on their own through the `shutdown` method (optionally coming back
//! from the re-read config); a process signal stops all of them together.

mod signals;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use toml::Table;
use tracing::{info, warn};

use crate::config::{bind_addr, ConfigFile};
use crate::listener::Listener;
use crate::{env, Context, Daemon, DaemonError};

use signals::Signals;

/// How a supervisor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Rebuild everything from the config file.
    Restart,
    Stop,
}

struct Running<D> {
    ctx: Context<D>,
    server: JoinHandle<()>,
}

/// Sent by an instance's server task once it has fully stopped.
#[derive(Debug)]
struct Stopped {
    name: String,
    restart: bool,
}

enum Next {
    Signal(Exit),
    Stopped(Option<Stopped>),
}

/// Registry of live daemon instances of one kind.
pub struct Supervisor<D> {
    config_filepath: PathBuf,
    state_root: PathBuf,
    daemons: BTreeMap<String, Running<D>>,
    stopped_tx: mpsc::UnboundedSender<Stopped>,
    stopped_rx: mpsc::UnboundedReceiver<Stopped>,
}

impl<D: Daemon> Supervisor<D> {
    pub fn new(config_filepath: impl Into<PathBuf>, state_root: impl Into<PathBuf>) -> Self {
        let (stopped_tx, stopped_rx) = mpsc::unbounded_channel();
        Self {
            config_filepath: config_filepath.into(),
            state_root: state_root.into(),
            daemons: BTreeMap::new(),
            stopped_tx,
            stopped_rx,
        }
    }

    /// Start every enabled section of `file`.
    pub async fn start_all(&mut self, file: &ConfigFile) -> Result<(), DaemonError> {
        if !file.enabled() {
            info!(path = %file.path().display(), "config disabled, nothing to start");
            return Ok(());
        }
        for name in file.sections() {
            match file.section_config(name, D::defaults())? {
                Some(config) => {
                    self.start(name, config).await?;
                }
                None => info!(daemon = name, "section disabled"),
            }
        }
        Ok(())
    }

    /// Construct an instance from its merged config, bind its port, and
    /// start serving.
    pub async fn start(&mut self, name: &str, config: Table) -> Result<Context<D>, DaemonError> {
        if self.daemons.contains_key(name) {
            return Err(DaemonError::Duplicate(name.to_string()));
        }
        let (host, port) = bind_addr(name, &config)?;
        let ctx = Context::<D>::new(name, config, &self.config_filepath, &self.state_root)?;

        let addr = format!("{host}:{port}");
        let tcp = match TcpListener::bind(&addr).await {
            Ok(tcp) => tcp,
            Err(source) => {
                ctx.close();
                return Err(DaemonError::BindFailed { addr, source });
            }
        };
        let local = tcp.local_addr()?;
        ctx.set_local_addr(local);
        info!(daemon = name, kind = D::KIND, addr = %local, "daemon listening");

        ctx.spawn_tasks();
        let server = tokio::spawn(run_instance(ctx.clone(), tcp, self.stopped_tx.clone()));
        self.daemons.insert(name.to_string(), Running { ctx: ctx.clone(), server });
        Ok(ctx)
    }

    pub fn get(&self, name: &str) -> Option<&Context<D>> {
        self.daemons.get(name).map(|r| &r.ctx)
    }

    pub fn names(&self) -> Vec<&str> {
        self.daemons.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.daemons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.daemons.is_empty()
    }

    /// Wait for one instance to stop on its own, drop it from the registry,
    /// and bring it back if it asked to restart. Returns its name.
    pub async fn handle_next_stop(&mut self) -> Option<String> {
        let stopped = self.stopped_rx.recv().await?;
        self.on_stopped(&stopped).await;
        Some(stopped.name)
    }

    async fn on_stopped(&mut self, stopped: &Stopped) {
        self.daemons.remove(&stopped.name);
        info!(daemon = %stopped.name, restart = stopped.restart, "daemon stopped");
        if stopped.restart {
            if let Err(e) = self.restart(&stopped.name).await {
                warn!(daemon = %stopped.name, error = %e, "restart failed");
            }
        }
    }

    async fn restart(&mut self, name: &str) -> Result<(), DaemonError> {
        let file = ConfigFile::load(&self.config_filepath)?;
        if !file.enabled() {
            info!(daemon = name, "config disabled, not restarting");
            return Ok(());
        }
        match file.section_config(name, D::defaults())? {
            Some(config) => {
                self.start(name, config).await?;
                info!(daemon = name, "daemon restarted");
            }
            None => info!(daemon = name, "section disabled, not restarting"),
        }
        Ok(())
    }

    /// Serve until `signal` resolves or no instance is left running.
    pub async fn run_until<F>(&mut self, signal: F) -> Exit
    where
        F: Future<Output = Exit>,
    {
        tokio::pin!(signal);
        loop {
            if self.daemons.is_empty() {
                info!("no daemons left running");
                return Exit::Stop;
            }
            let next = tokio::select! {
                exit = &mut signal => Next::Signal(exit),
                stopped = self.stopped_rx.recv() => Next::Stopped(stopped),
            };
            match next {
                Next::Signal(exit) => {
                    self.shutdown_all().await;
                    return exit;
                }
                Next::Stopped(Some(stopped)) => self.on_stopped(&stopped).await,
                Next::Stopped(None) => {}
            }
        }
    }

    /// Stop every instance together: background tasks first, then each
    /// `close` hook, then a final save, then the listeners.
    pub async fn shutdown_all(&mut self) {
        if self.daemons.is_empty() {
            return;
        }
        info!(count = self.daemons.len(), "shutting down all daemons");

        for running in self.daemons.values() {
            running.ctx.cancel_tasks();
        }
        for running in self.daemons.values() {
            running.ctx.stop_tasks().await;
        }
        for running in self.daemons.values() {
            running.ctx.close();
        }
        for running in self.daemons.values() {
            if let Err(e) = running.ctx.save_state() {
                warn!(daemon = running.ctx.name(), error = %e, "final save failed");
            }
        }

        let daemons = std::mem::take(&mut self.daemons);
        for running in daemons.values() {
            running.ctx.stop_token().cancel();
        }
        for (name, running) in daemons {
            if let Err(e) = running.server.await {
                warn!(daemon = %name, error = %e, "server task ended abnormally");
            }
        }
        // Drain stop notices from the instances just shut down.
        while self.stopped_rx.try_recv().is_ok() {}
    }
}

async fn run_instance<D: Daemon>(
    ctx: Context<D>,
    tcp: TcpListener,
    stopped: mpsc::UnboundedSender<Stopped>,
) {
    let tcp = Listener::new(tcp, ctx.clone()).run().await;
    ctx.stop_tasks().await;
    ctx.close();
    drop(tcp);
    let _ = stopped.send(Stopped { name: ctx.name().to_string(), restart: ctx.restart_requested() });
}

/// Run every daemon of kind `D` configured in `config_filepath` until a
/// stop signal, or until all of them have shut down. SIGHUP rebuilds the
/// whole set from the re-read file.
pub async fn serve<D: Daemon>(config_filepath: &Path) -> Result<(), DaemonError> {
    let state_root = env::state_dir()?;
    let mut signals = Signals::install()?;

    loop {
        let file = ConfigFile::load(config_filepath)?;
        let mut supervisor = Supervisor::<D>::new(config_filepath, state_root.clone());
        if let Err(e) = supervisor.start_all(&file).await {
            supervisor.shutdown_all().await;
            return Err(e);
        }

        match supervisor.run_until(signals.recv()).await {
            Exit::Restart => info!(path = %config_filepath.display(), "restarting from config"),
            Exit::Stop => return Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
