// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line entry point shared by daemon binaries.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{env, serve, Daemon};

#[derive(Debug, Parser)]
#[command(version, about = "Serve every daemon configured in a TOML file")]
pub struct Args {
    /// Config file (default: <config dir>/yaqd-<kind>/config.toml, or YAQD_CONFIG)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless YAQD_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn config_path(&self, kind: &str) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(env::config_path(kind)?),
        }
    }
}

/// Parse arguments, install logging, and serve daemons of kind `D` on a
/// single-threaded runtime.
pub fn main<D: Daemon>() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.config_path(D::KIND)?;
    info!(kind = D::KIND, config = %config.display(), "starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime
        .block_on(serve::<D>(&config))
        .with_context(|| format!("serving {}", config.display()))?;

    info!(kind = D::KIND, "exiting");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(env::LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
