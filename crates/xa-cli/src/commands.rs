// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Subcommand implementations

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::{info, warn};
use xa_alias::{AliasRecord, DecodeOptions, FileProbe, ResolveOptions, Resolver, decode_with};
use xa_domain_types::Version;

use crate::config::CliConfig;
use crate::launch_services;
use crate::preferences::{self, PreferenceEntry};
use crate::xcode::{self, ShellRunner};

/// Everything a subcommand needs from the outside world
pub struct Context<'a> {
    pub config: &'a CliConfig,
    pub shell: &'a dyn ShellRunner,
    pub probe: &'a dyn FileProbe,
}

impl<'a> Context<'a> {
    fn decode_options(&self, lenient_flag: bool) -> DecodeOptions {
        if lenient_flag || self.config.decode.lenient_checksum {
            DecodeOptions::lenient()
        } else {
            DecodeOptions::default()
        }
    }

    fn resolver(&self, volumes_root: Option<&Path>) -> Resolver {
        Resolver::new(ResolveOptions {
            volumes_root: volumes_root
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.config.resolve.volumes_root.clone()),
        })
    }

    fn probe(&self, no_verify: bool) -> Option<&'a dyn FileProbe> {
        (self.config.resolve.verify && !no_verify).then_some(self.probe)
    }
}

fn read_record(path: &Path, options: DecodeOptions) -> Result<AliasRecord> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    decode_with(&bytes, options).with_context(|| format!("decoding {}", path.display()))
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(about = "Print the decoded fields of an alias record as JSON")]
pub struct DecodeArgs {
    /// File containing the raw alias record
    pub file: PathBuf,

    #[arg(long, help = "Accept records with a mismatching checksum")]
    pub lenient: bool,
}

impl DecodeArgs {
    pub fn run(self, ctx: &Context<'_>, out: &mut dyn Write) -> Result<()> {
        let record = read_record(&self.file, ctx.decode_options(self.lenient))?;
        serde_json::to_writer_pretty(&mut *out, &record)?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(about = "Resolve an alias record to a filesystem path")]
pub struct ResolveArgs {
    /// File containing the raw alias record
    pub file: PathBuf,

    #[arg(long, help = "Accept records with a mismatching checksum")]
    pub lenient: bool,

    #[arg(long, help = "Do not consult the filesystem; print the best-effort path")]
    pub no_verify: bool,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory volumes are mounted under (default: /Volumes)"
    )]
    pub volumes_root: Option<PathBuf>,
}

impl ResolveArgs {
    pub fn run(self, ctx: &Context<'_>, out: &mut dyn Write) -> Result<()> {
        let record = read_record(&self.file, ctx.decode_options(self.lenient))?;
        let resolver = ctx.resolver(self.volumes_root.as_deref());
        let path = resolver
            .resolve(&record, ctx.probe(self.no_verify))
            .into_result()
            .with_context(|| format!("resolving {}", self.file.display()))?;
        writeln!(out, "{}", path.display())?;
        Ok(())
    }
}

/// `ARCH=FILE` pair given to `current --entry`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryArg {
    pub architecture: String,
    pub file: PathBuf,
}

impl std::str::FromStr for EntryArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((architecture, file)) if !architecture.is_empty() && !file.is_empty() => {
                Ok(EntryArg {
                    architecture: architecture.to_string(),
                    file: PathBuf::from(file),
                })
            }
            _ => Err(format!("expected ARCH=FILE, got `{}`", s)),
        }
    }
}

fn read_entry_args(args: &[EntryArg]) -> Result<Vec<PreferenceEntry>> {
    args.iter()
        .map(|entry| -> Result<PreferenceEntry> {
            let alias = std::fs::read(&entry.file)
                .with_context(|| format!("reading {}", entry.file.display()))?;
            Ok(PreferenceEntry {
                alias,
                architecture: entry.architecture.clone(),
            })
        })
        .collect()
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(about = "Print the architecture recorded for the active Xcode")]
pub struct CurrentArgs {
    #[arg(long, value_name = "PATH", help = "Application bundle (default: from xcode-select)")]
    pub app: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "LaunchServices preferences file (default: the per-user LaunchServices plist)"
    )]
    pub plist: Option<PathBuf>,

    #[arg(
        long = "entry",
        value_name = "ARCH=FILE",
        conflicts_with = "plist",
        help = "Preference entry read instead of the plist: architecture and alias record file"
    )]
    pub entries: Vec<EntryArg>,

    #[arg(long, help = "Accept records with a mismatching checksum")]
    pub lenient: bool,

    #[arg(long, help = "Do not consult the filesystem while resolving entries")]
    pub no_verify: bool,
}

impl CurrentArgs {
    pub fn run(self, ctx: &Context<'_>, out: &mut dyn Write) -> Result<()> {
        let app = match self.app {
            Some(app) => app,
            None => xcode::current_xcode_path(ctx.shell)?,
        };

        let entries = if self.entries.is_empty() {
            let plist = match self.plist {
                Some(plist) => plist,
                None => launch_services::default_plist_path()?,
            };
            launch_services::read_entries(&plist, launch_services::XCODE_BUNDLE_ID)?
        } else {
            read_entry_args(&self.entries)?
        };

        let probe = ctx.probe(self.no_verify);
        let resolved = preferences::resolve_entries(
            &entries,
            &ctx.resolver(None),
            ctx.decode_options(self.lenient),
            probe,
        );
        let architecture = preferences::architecture_for(&app, &resolved, probe);
        info!(
            app = %app.display(),
            %architecture,
            entries = resolved.len(),
            "current architecture"
        );

        writeln!(out, "`{}` is running with {}", app.display(), architecture)?;
        Ok(())
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[command(about = "Check whether the active Xcode can still run under Rosetta")]
pub struct CheckVersionArgs {
    #[arg(long, value_name = "X.Y.Z", help = "Version to check (default: from xcodebuild)")]
    pub version: Option<Version>,
}

impl CheckVersionArgs {
    /// Returns whether the checked version still supports Rosetta
    pub fn run(self, ctx: &Context<'_>, out: &mut dyn Write) -> Result<bool> {
        let version = match self.version {
            Some(version) => version,
            None => xcode::current_xcode_version(ctx.shell)?,
        };

        if xcode::supports_rosetta(&version) {
            writeln!(out, "Xcode {} supports Rosetta", xcode::short_version(&version))?;
            return Ok(true);
        }

        warn!(%version, "Xcode no longer supports Rosetta");
        writeln!(
            out,
            "[WARN] Xcode no longer supports Rosetta since {} and current version is {}.",
            xcode::short_version(&xcode::ROSETTA_CUTOFF),
            xcode::short_version(&version)
        )?;
        writeln!(
            out,
            "This tool will be EOL when Xcode {} is required for submission to the App Store.",
            xcode::short_version(&xcode::ROSETTA_CUTOFF)
        )?;
        Ok(false)
    }
}
