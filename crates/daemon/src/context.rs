// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A live daemon instance.
//!
//! [`Context`] is a cheap handle shared by the listener, every connection,
//! and the background tasks of one instance. It owns the implementation
//! value, the identity and merged config, the busy signal, and the state
//! store.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rmpv::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toml::Table;
use tracing::{debug, info, warn};
use yaqd_storage::{StateLoad, StateStore, StoreError};

use crate::method::builtin_methods;
use crate::{convert, env, BusySignal, Daemon, DaemonError, MethodTable};

/// Identifying fields reported by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub kind: &'static str,
    pub make: Option<toml::Value>,
    pub model: Option<toml::Value>,
    pub serial: Option<toml::Value>,
}

impl Identity {
    fn from_config(name: &str, kind: &'static str, config: &Table) -> Self {
        Self {
            name: name.to_string(),
            kind,
            make: config.get("make").cloned(),
            model: config.get("model").cloned(),
            serial: config.get("serial").cloned(),
        }
    }

    pub fn to_value(&self) -> Value {
        let field = |v: &Option<toml::Value>| v.as_ref().map(convert::to_value).unwrap_or(Value::Nil);
        Value::Map(vec![
            (Value::from("name"), Value::from(self.name.as_str())),
            (Value::from("kind"), Value::from(self.kind)),
            (Value::from("make"), field(&self.make)),
            (Value::from("model"), field(&self.model)),
            (Value::from("serial"), field(&self.serial)),
        ])
    }
}

struct Shared<D> {
    identity: Identity,
    config: Table,
    config_filepath: PathBuf,
    store: StateStore,
    busy: BusySignal,
    methods: MethodTable<D>,
    daemon: Mutex<D>,
    peers: Mutex<Vec<SocketAddr>>,
    local_addr: Mutex<Option<SocketAddr>>,
    /// Background save/update tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    tasks_cancel: CancellationToken,
    /// Cancelled when this instance has been asked to shut down.
    stop: CancellationToken,
    restart: AtomicBool,
    closed: AtomicBool,
}

/// Handle to one running daemon instance.
pub struct Context<D> {
    shared: Arc<Shared<D>>,
}

impl<D> Clone for Context<D> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<D> std::fmt::Debug for Context<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.shared.identity.name)
            .field("kind", &self.shared.identity.kind)
            .field("local_addr", &*self.shared.local_addr.lock())
            .finish()
    }
}

impl<D: Daemon> Context<D> {
    /// Build an instance: construct the implementation, then restore its
    /// state from `<state_root>/<kind>/<name>-state.toml`.
    ///
    /// A missing or unreadable state file, or one the implementation
    /// rejects, is replaced by an empty table rather than failing startup.
    pub fn new(
        name: &str,
        config: Table,
        config_filepath: &Path,
        state_root: &Path,
    ) -> Result<Self, DaemonError> {
        let mut daemon = D::new(&config)?;
        let store = StateStore::for_daemon(state_root, D::KIND, name);

        let state = match store.load() {
            StateLoad::Loaded(table) => table,
            StateLoad::Missing => Table::new(),
            StateLoad::Unreadable(reason) => {
                warn!(daemon = name, %reason, "state file unreadable, starting from empty state");
                Table::new()
            }
        };
        if let Err(e) = daemon.load_state(state) {
            warn!(daemon = name, error = %e, "persisted state rejected, starting from empty state");
            daemon.load_state(Table::new())?;
        }

        let methods = MethodTable::new(builtin_methods::<D>().into_iter().chain(D::methods()));
        let config_filepath =
            std::path::absolute(config_filepath).unwrap_or_else(|_| config_filepath.to_path_buf());

        Ok(Self {
            shared: Arc::new(Shared {
                identity: Identity::from_config(name, D::KIND, &config),
                config,
                config_filepath,
                store,
                busy: BusySignal::new(),
                methods,
                daemon: Mutex::new(daemon),
                peers: Mutex::new(Vec::new()),
                local_addr: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
                tasks_cancel: CancellationToken::new(),
                stop: CancellationToken::new(),
                restart: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.identity.name
    }

    pub fn kind(&self) -> &'static str {
        D::KIND
    }

    pub fn identity(&self) -> &Identity {
        &self.shared.identity
    }

    pub fn config(&self) -> &Table {
        &self.shared.config
    }

    pub fn config_filepath(&self) -> &Path {
        &self.shared.config_filepath
    }

    pub fn state_filepath(&self) -> &Path {
        self.shared.store.path()
    }

    pub fn methods(&self) -> &MethodTable<D> {
        &self.shared.methods
    }

    /// Run `f` with exclusive access to the implementation.
    ///
    /// Do not call back into this context's state methods from `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.shared.daemon.lock())
    }

    pub fn get_state(&self) -> Table {
        self.with(|d| d.get_state())
    }

    /// Overlay `partial` on the current state, validate the merged table
    /// through [`Daemon::load_state`], then persist it.
    pub fn set_state(&self, partial: Table) -> Result<(), DaemonError> {
        self.with(|d| {
            let mut state = d.get_state();
            state.extend(partial);
            d.load_state(state)
        })?;
        self.save_state()?;
        Ok(())
    }

    /// Write the current state to the state file.
    pub fn save_state(&self) -> Result<(), StoreError> {
        let state = self.get_state();
        self.shared.store.save(&state)
    }

    pub fn busy(&self) -> &BusySignal {
        &self.shared.busy
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.get()
    }

    pub fn set_busy(&self, busy: bool) {
        self.shared.busy.set(busy);
    }

    /// Addresses of connected clients.
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.shared.peers.lock().clone()
    }

    pub(crate) fn add_peer(&self, peer: SocketAddr) {
        debug!(daemon = self.name(), %peer, "client connected");
        self.shared.peers.lock().push(peer);
    }

    pub(crate) fn remove_peer(&self, peer: SocketAddr) {
        debug!(daemon = self.name(), %peer, "client disconnected");
        let mut peers = self.shared.peers.lock();
        if let Some(pos) = peers.iter().position(|p| *p == peer) {
            peers.remove(pos);
        }
    }

    /// Address the listener is bound to, once bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.shared.local_addr.lock()
    }

    pub(crate) fn set_local_addr(&self, addr: SocketAddr) {
        *self.shared.local_addr.lock() = Some(addr);
    }

    /// Ask this instance to shut down, optionally coming back up from the
    /// current config file.
    pub fn request_shutdown(&self, restart: bool) {
        info!(daemon = self.name(), restart, "shutdown requested");
        if restart {
            self.shared.restart.store(true, Ordering::SeqCst);
        }
        self.shared.stop.cancel();
    }

    pub fn restart_requested(&self) -> bool {
        self.shared.restart.load(Ordering::SeqCst)
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    pub(crate) fn stop_token(&self) -> CancellationToken {
        self.shared.stop.clone()
    }

    /// Start the periodic save task and the implementation's update task.
    pub(crate) fn spawn_tasks(&self) {
        let cancel = self.shared.tasks_cancel.clone();
        let save = tokio::spawn(save_loop(self.clone(), cancel.clone()));
        let ctx = self.clone();
        let update = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = D::update_state(ctx) => {}
            }
        });
        self.shared.tasks.lock().extend([save, update]);
    }

    /// Signal background tasks to stop without waiting for them.
    pub(crate) fn cancel_tasks(&self) {
        self.shared.tasks_cancel.cancel();
    }

    /// Cancel background tasks and wait for them to finish.
    pub(crate) async fn stop_tasks(&self) {
        self.cancel_tasks();
        let tasks = std::mem::take(&mut *self.shared.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(daemon = self.name(), error = %e, "background task ended abnormally");
            }
        }
    }

    /// Run the implementation's close hook, at most once.
    pub(crate) fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(daemon = self.name(), "closing");
        self.with(|d| d.close());
    }
}

/// Persist state; poll while busy, otherwise sleep until the daemon
/// becomes busy.
async fn save_loop<D: Daemon>(ctx: Context<D>, cancel: CancellationToken) {
    let interval = env::save_interval();
    loop {
        if let Err(e) = ctx.save_state() {
            warn!(daemon = ctx.name(), error = %e, "failed to save state");
        }
        let pause = async {
            if ctx.is_busy() {
                tokio::time::sleep(interval).await;
            } else {
                ctx.busy().wait_busy().await;
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = pause => {}
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
