// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Filesystem-backed probe for the alias resolver

use std::fs;
use std::path::Path;

use xa_alias::{FileIdentity, FileProbe};

/// Probe backed by `stat(2)`; identity is `(st_dev, st_ino)`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn path_exists(&self, candidate: &Path) -> bool {
        fs::metadata(candidate).is_ok()
    }

    #[cfg(unix)]
    fn identifier_of(&self, candidate: &Path) -> Option<FileIdentity> {
        use std::os::unix::fs::MetadataExt;

        let metadata = fs::metadata(candidate).ok()?;
        Some(FileIdentity {
            device: metadata.dev(),
            catalog_id: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn identifier_of(&self, _candidate: &Path) -> Option<FileIdentity> {
        None
    }
}
