// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::process::ExitCode;

use anyhow::Result;
use xa_cli::config::CliConfig;
use xa_cli::probe::FsProbe;
use xa_cli::xcode::DefaultShellRunner;
use xa_cli::{Cli, Context, Parser};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    cli.logging.merged_with(&config.logging).init("xcode-arch")?;

    let ctx = Context {
        config: &config,
        shell: &DefaultShellRunner,
        probe: &FsProbe,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli.command.run(&ctx, &mut out)
}
