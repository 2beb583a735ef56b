// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for specs.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use toml::Table;

pub use yaqd_daemon::{
    BaseDaemon, CallError, ConfigFile, Context, Daemon, DaemonError, Exit, Method, StateError,
    Supervisor,
};
pub use yaqd_wire::{encode, Params, Request, StreamDecoder, Value};

/// Upper bound for anything a spec waits on.
pub const SPEC_WAIT: Duration = Duration::from_secs(5);

/// Await `fut`, failing the spec if it takes longer than [`SPEC_WAIT`].
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(SPEC_WAIT, fut).await.expect("timed out")
}

/// Poll `check` until it holds or [`SPEC_WAIT`] elapses.
pub async fn wait_for<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + SPEC_WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// A supervisor of kind `D` running in the background over a config file
/// in a scratch directory.
pub struct Daemons {
    dir: TempDir,
    addrs: BTreeMap<String, SocketAddr>,
    signal: Option<oneshot::Sender<Exit>>,
    run: JoinHandle<Exit>,
}

impl Daemons {
    pub async fn start<D: Daemon>(config: &str) -> Self {
        Self::start_in::<D>(tempfile::tempdir().unwrap(), config).await
    }

    /// Start with a state directory that may already hold state files.
    pub async fn start_in<D: Daemon>(dir: TempDir, config: &str) -> Self {
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, config).unwrap();

        let mut supervisor = Supervisor::<D>::new(&config_path, dir.path().join("state"));
        let file = ConfigFile::load(&config_path).unwrap();
        supervisor.start_all(&file).await.unwrap();

        let addrs = supervisor
            .names()
            .into_iter()
            .map(|name| {
                let addr = supervisor.get(name).and_then(|ctx| ctx.local_addr()).unwrap();
                (name.to_string(), addr)
            })
            .collect();

        let (tx, rx) = oneshot::channel();
        let run = tokio::spawn(async move {
            let signal = async { rx.await.unwrap_or(Exit::Stop) };
            supervisor.run_until(signal).await
        });
        Self { dir, addrs, signal: Some(tx), run }
    }

    pub fn addr(&self, name: &str) -> SocketAddr {
        self.addrs[name]
    }

    pub async fn connect(&self, name: &str) -> Client {
        Client::connect(self.addr(name)).await
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_file(&self, kind: &str, name: &str) -> PathBuf {
        self.dir.path().join("state").join(kind).join(format!("{name}-state.toml"))
    }

    pub fn rewrite_config(&self, config: &str) {
        std::fs::write(self.dir.path().join("config.toml"), config).unwrap();
    }

    /// Deliver a process-wide signal and wait for the supervisor to finish.
    pub async fn signal(mut self, exit: Exit) -> (TempDir, Exit) {
        if let Some(tx) = self.signal.take() {
            let _ = tx.send(exit);
        }
        let exit = within(self.run).await.unwrap();
        (self.dir, exit)
    }

    /// Wait for the supervisor to finish on its own.
    pub async fn finished(self) -> Exit {
        let _keep = self.signal;
        within(self.run).await.unwrap()
    }
}

/// One RPC connection.
pub struct Client {
    stream: TcpStream,
    decoder: StreamDecoder,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = within(TcpStream::connect(addr)).await.unwrap();
        Self { stream, decoder: StreamDecoder::new() }
    }

    pub async fn send(&mut self, request: Request) {
        self.send_raw(&encode(&request.to_value()).unwrap()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Next response, or `None` once the daemon closed the connection.
    pub async fn recv(&mut self) -> Option<Value> {
        let mut buf = [0u8; 4096];
        loop {
            if let Some(value) = self.decoder.next_value().unwrap() {
                return Some(value);
            }
            let n = within(self.stream.read(&mut buf)).await.unwrap_or(0);
            if n == 0 {
                return None;
            }
            self.decoder.feed(&buf[..n]);
        }
    }

    /// Call `method` with id 1 and return the full response.
    pub async fn call(&mut self, method: &str, params: Params) -> Value {
        self.send(Request::call(method, 1, params)).await;
        self.recv().await.expect("connection closed before response")
    }

    /// Call `method` and return its `result`, failing on an error response.
    pub async fn result(&mut self, method: &str, params: Params) -> Value {
        let response = self.call(method, params).await;
        match field(&response, "result") {
            Some(result) => result.clone(),
            None => panic!("{method} failed: {response}"),
        }
    }
}

pub fn positional(values: Vec<Value>) -> Params {
    Params::Positional(values)
}

pub fn named(pairs: &[(&str, Value)]) -> Params {
    Params::Named(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

pub fn map(pairs: &[(&str, Value)]) -> Value {
    Value::Map(pairs.iter().map(|(k, v)| (Value::from(*k), v.clone())).collect())
}

pub fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.as_map()?.iter().find(|(k, _)| k.as_str() == Some(key)).map(|(_, v)| v)
}

pub fn error_code(response: &Value) -> Option<i64> {
    field(field(response, "error")?, "code")?.as_i64()
}

/// A motion stage: `set_position` makes it busy until the update task has
/// moved it to the destination.
#[derive(Debug, Default)]
pub struct Stage {
    position: f64,
    destination: f64,
}

#[async_trait]
impl Daemon for Stage {
    const KIND: &'static str = "stage";

    fn new(_config: &Table) -> Result<Self, DaemonError> {
        Ok(Self::default())
    }

    fn get_state(&self) -> Table {
        let mut state = Table::new();
        state.insert("position".into(), self.position.into());
        state.insert("destination".into(), self.destination.into());
        state
    }

    fn load_state(&mut self, state: Table) -> Result<(), StateError> {
        let number = |key: &str| match state.get(key) {
            None => Ok(0.0),
            Some(toml::Value::Float(f)) => Ok(*f),
            Some(toml::Value::Integer(i)) => Ok(*i as f64),
            Some(other) => Err(StateError(format!("{key} must be a number, got {other}"))),
        };
        let position = number("position")?;
        // A state without a destination parks the stage where it is.
        self.destination =
            if state.contains_key("destination") { number("destination")? } else { position };
        self.position = position;
        Ok(())
    }

    async fn update_state(ctx: Context<Self>) {
        loop {
            let arrived = ctx.with(|stage| {
                let moved = stage.position != stage.destination;
                stage.position = stage.destination;
                moved
            });
            if arrived {
                ctx.set_busy(false);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn methods() -> Vec<Method<Self>> {
        vec![
            Method::<Self>::new("set_position", "Start moving to `position`.", |ctx, args| {
                let position: f64 = args.require("position")?;
                ctx.with(|stage| stage.destination = position);
                ctx.set_busy(true);
                Ok(Value::Nil)
            })
            .param("position"),
            Method::<Self>::new("home", "Fails: this stage has no limit switch.", |_, _| {
                Err(CallError::failed("no limit switch"))
            }),
        ]
    }
}
