// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reader for the per-user LaunchServices preferences
//!
//! Architecture choices live under `Architectures for arm64`, keyed by bundle
//! identifier. Each value is a flat array alternating an alias record (data)
//! and an architecture (string).

use std::io::Cursor;
use std::path::{Path, PathBuf};

use plist::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::preferences::PreferenceEntry;

pub const PLIST_RELATIVE_PATH: &str =
    "Library/Preferences/com.apple.LaunchServices/com.apple.LaunchServices.plist";
pub const ARCHITECTURES_KEY: &str = "Architectures for arm64";
pub const XCODE_BUNDLE_ID: &str = "com.apple.dt.Xcode";

#[derive(Error, Debug)]
pub enum LaunchServicesError {
    #[error("{} not found.", .0.display())]
    PlistNotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid plist: {0}")]
    InvalidPlist(String),
    #[error("cannot locate the home directory")]
    NoHomeDir,
}

/// `~/Library/Preferences/com.apple.LaunchServices/com.apple.LaunchServices.plist`
pub fn default_plist_path() -> Result<PathBuf, LaunchServicesError> {
    dirs::home_dir()
        .map(|home| home.join(PLIST_RELATIVE_PATH))
        .ok_or(LaunchServicesError::NoHomeDir)
}

/// Preference entries recorded for `bundle_id`
///
/// A missing bundle key yields no entries. Pairs whose members have the wrong
/// type are skipped.
pub fn read_entries(
    path: &Path,
    bundle_id: &str,
) -> Result<Vec<PreferenceEntry>, LaunchServicesError> {
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LaunchServicesError::PlistNotFound(path.to_path_buf())
        } else {
            LaunchServicesError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let value = Value::from_reader(Cursor::new(bytes))
        .map_err(|err| LaunchServicesError::InvalidPlist(err.to_string()))?;
    entries_from_value(&value, bundle_id)
}

fn entries_from_value(
    value: &Value,
    bundle_id: &str,
) -> Result<Vec<PreferenceEntry>, LaunchServicesError> {
    let architectures = value
        .as_dictionary()
        .and_then(|root| root.get(ARCHITECTURES_KEY))
        .and_then(Value::as_dictionary)
        .ok_or_else(|| {
            LaunchServicesError::InvalidPlist(format!("missing `{ARCHITECTURES_KEY}` dictionary"))
        })?;

    let Some(pairs) = architectures.get(bundle_id) else {
        debug!(bundle_id, "no architecture preferences recorded");
        return Ok(Vec::new());
    };
    let pairs = pairs.as_array().ok_or_else(|| {
        LaunchServicesError::InvalidPlist(format!("`{bundle_id}` is not an array"))
    })?;
    if pairs.len() % 2 != 0 {
        return Err(LaunchServicesError::InvalidPlist(format!(
            "`{bundle_id}` has {} items; expected alias and architecture pairs",
            pairs.len()
        )));
    }

    let entries = pairs
        .chunks_exact(2)
        .enumerate()
        .filter_map(|(index, pair)| match (pair[0].as_data(), pair[1].as_string()) {
            (Some(alias), Some(architecture)) => Some(PreferenceEntry {
                alias: alias.to_vec(),
                architecture: architecture.to_string(),
            }),
            _ => {
                warn!(index, bundle_id, "skipping malformed preference pair");
                None
            }
        })
        .collect();
    Ok(entries)
}
