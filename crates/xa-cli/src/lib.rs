// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::io::Write;
use std::process::ExitCode;

use clap::Subcommand;
use xa_logging::CliLoggingArgs;

pub mod commands;
pub mod config;
pub mod launch_services;
pub mod preferences;
pub mod probe;
pub mod xcode;

pub use clap::Parser;
pub use commands::Context;

#[derive(clap::Parser, Debug)]
#[command(
    name = "xcode-arch",
    about = "Inspect alias records and the launch architecture of Xcode",
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Configuration file (default: <config dir>/xcode-arch/config.toml)"
    )]
    pub config: Option<std::path::PathBuf>,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    Decode(commands::DecodeArgs),
    Resolve(commands::ResolveArgs),
    Current(commands::CurrentArgs),
    CheckVersion(commands::CheckVersionArgs),
}

impl Commands {
    pub fn run(self, ctx: &Context<'_>, out: &mut dyn Write) -> anyhow::Result<ExitCode> {
        match self {
            Commands::Decode(args) => args.run(ctx, out)?,
            Commands::Resolve(args) => args.run(ctx, out)?,
            Commands::Current(args) => args.run(ctx, out)?,
            Commands::CheckVersion(args) => {
                if !args.run(ctx, out)? {
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}
