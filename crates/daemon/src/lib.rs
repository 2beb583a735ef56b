// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! yaq daemon runtime
//!
//! A daemon kind implements [`Daemon`]; the runtime supplies the RPC
//! surface every daemon shares, the TCP listener, state persistence, and
//! coordinated shutdown across all instances configured in one file.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cli;
pub mod config;
pub mod convert;
pub mod env;

mod busy;
mod context;
mod daemon;
mod error;
mod lifecycle;
mod listener;
mod method;
mod plain;

pub use busy::BusySignal;
pub use config::{ConfigError, ConfigFile};
pub use context::{Context, Identity};
pub use daemon::{Daemon, StateError};
pub use error::DaemonError;
pub use lifecycle::{serve, Exit, Supervisor};
pub use method::{Args, CallError, Method, MethodTable, Param};
pub use plain::BaseDaemon;
