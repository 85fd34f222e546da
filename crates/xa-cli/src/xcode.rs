// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Queries about the active Xcode installation

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::debug;
use xa_domain_types::Version;

pub const XCODE_SELECT: &str = "/usr/bin/xcode-select";
pub const XCODEBUILD: &str = "/usr/bin/xcodebuild";
const DEVELOPER_DIR_SUFFIX: &str = "/Contents/Developer";

/// First Xcode release that cannot run under Rosetta
pub const ROSETTA_CUTOFF: Version = Version::new(14, 3, 0);

#[derive(Error, Debug)]
pub enum XcodeError {
    #[error("Xcode is not installed")]
    UnknownXcodePath,
    #[error("could not determine the Xcode version from `{0}`")]
    UnknownXcodeVersion(String),
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },
    #[error("`{command}` printed non-UTF-8 output")]
    InvalidOutput { command: String },
}

/// Runs external programs and returns their stdout without trailing newlines
pub trait ShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, XcodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultShellRunner;

impl ShellRunner for DefaultShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, XcodeError> {
        let command = command_line(program, args);
        debug!(%command, "running");

        let output = Command::new(program).args(args).output().map_err(|source| {
            XcodeError::Spawn {
                command: command.clone(),
                source,
            }
        })?;
        if !output.status.success() {
            return Err(XcodeError::CommandFailed {
                command,
                status: output.status.to_string(),
            });
        }

        let stdout =
            String::from_utf8(output.stdout).map_err(|_| XcodeError::InvalidOutput { command })?;
        Ok(stdout.trim_end_matches(['\n', '\r']).to_string())
    }
}

/// `program arg1 arg2`, as shown in logs and errors
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" ")
}

/// Application bundle of the selected Xcode, from `xcode-select -p`
pub fn current_xcode_path(shell: &dyn ShellRunner) -> Result<PathBuf, XcodeError> {
    let developer_dir = shell.run(XCODE_SELECT, &["-p"])?;
    developer_dir
        .trim()
        .strip_suffix(DEVELOPER_DIR_SUFFIX)
        .filter(|app| !app.is_empty())
        .map(PathBuf::from)
        .ok_or(XcodeError::UnknownXcodePath)
}

/// Version from the first line of `xcodebuild -version`, e.g. `Xcode 14.2`
pub fn current_xcode_version(shell: &dyn ShellRunner) -> Result<Version, XcodeError> {
    let info = shell.run(XCODEBUILD, &["-version"])?;
    let first_line = info.lines().next().unwrap_or_default();
    first_line
        .split_whitespace()
        .last()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| XcodeError::UnknownXcodeVersion(first_line.to_string()))
}

pub fn supports_rosetta(version: &Version) -> bool {
    *version < ROSETTA_CUTOFF
}

/// `14.3.0` -> `14.3`, `15.0.0` -> `15`
pub fn short_version(version: &Version) -> String {
    let mut text = format!("{}.{}.{}", version.major, version.minor, version.patch);
    while let Some(stripped) = text.strip_suffix(".0") {
        text = stripped.to_string();
    }
    if let Some(pre) = &version.pre_release {
        text.push('-');
        text.push_str(pre);
    }
    text
}
