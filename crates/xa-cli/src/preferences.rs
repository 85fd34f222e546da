// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Per-application architecture preferences
//!
//! The system stores one entry per preferred application: an alias record
//! naming the app bundle, paired with an architecture string. Entries whose
//! alias no longer decodes or resolves belong to removed applications and are
//! skipped.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use xa_alias::{DecodeOptions, FileProbe, Resolver, decode_with};
use xa_domain_types::Architecture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceEntry {
    pub alias: Vec<u8>,
    /// Raw architecture string as stored alongside the alias
    pub architecture: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPreference {
    pub path: PathBuf,
    pub architecture: String,
}

/// Decode and resolve every entry, dropping the ones that fail
pub fn resolve_entries(
    entries: &[PreferenceEntry],
    resolver: &Resolver,
    decode_options: DecodeOptions,
    probe: Option<&dyn FileProbe>,
) -> Vec<ResolvedPreference> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let record = match decode_with(&entry.alias, decode_options) {
                Ok(record) => record,
                Err(err) => {
                    warn!(index, %err, "skipping undecodable preference entry");
                    return None;
                }
            };
            match resolver.resolve(&record, probe).into_result() {
                Ok(path) => Some(ResolvedPreference {
                    path,
                    architecture: entry.architecture.clone(),
                }),
                Err(reason) => {
                    debug!(
                        index,
                        %reason,
                        target = %record.target_name,
                        "skipping removed application"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Architecture recorded for `app`, defaulting to the native one
///
/// The first entry naming the app decides; an unrecognised architecture string
/// also falls back to the default. With a filesystem view, an entry also names the app
/// when both paths report the same file identity, so a path reached through a
/// volume mount still matches.
pub fn architecture_for(
    app: &Path,
    preferences: &[ResolvedPreference],
    probe: Option<&dyn FileProbe>,
) -> Architecture {
    let app_identity = probe.and_then(|probe| probe.identifier_of(app));
    preferences
        .iter()
        .find(|preference| {
            preference.path == app
                || app_identity.is_some_and(|identity| {
                    probe.and_then(|probe| probe.identifier_of(&preference.path))
                        == Some(identity)
                })
        })
        .and_then(|preference| preference.architecture.parse().ok())
        .unwrap_or_default()
}
