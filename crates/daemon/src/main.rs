// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `yaqd-base`: serves the plain `base` daemon kind.

use yaqd_daemon::BaseDaemon;

fn main() -> anyhow::Result<()> {
    yaqd_daemon::cli::main::<BaseDaemon>()
}
