// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Path resolution for decoded alias records
//!
//! Strategies are tried in order and the first success wins:
//!
//! 1. the recorded POSIX path (under its recorded mount point),
//! 2. the HFS path components joined under the volume's mount location,
//! 3. catalog-id matching of candidates on the volume (needs a probe).
//!
//! Without a [`FileProbe`] nothing is verified and the first available
//! candidate is returned as a best effort.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::record::AliasRecord;
use crate::tags;

/// Identity of a live filesystem object as reported by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    /// Key of the device/volume the object lives on
    pub device: u64,
    /// Catalog id (inode number) of the object on that device
    pub catalog_id: u64,
}

/// Caller-supplied view of the live filesystem
///
/// The resolver never touches the filesystem itself; everything it learns
/// about existence and identity comes through this trait.
pub trait FileProbe {
    fn path_exists(&self, candidate: &Path) -> bool;
    fn identifier_of(&self, candidate: &Path) -> Option<FileIdentity>;
}

impl<P: FileProbe + ?Sized> FileProbe for &P {
    fn path_exists(&self, candidate: &Path) -> bool {
        (**self).path_exists(candidate)
    }

    fn identifier_of(&self, candidate: &Path) -> Option<FileIdentity> {
        (**self).identifier_of(candidate)
    }
}

/// Why no path could be produced
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvableReason {
    #[error("the volume holding the target was not found")]
    VolumeNotFound,
    #[error("the target was not found on its volume")]
    TargetNotFound,
    #[error("the alias record carries no usable path data")]
    NoUsablePathData,
}

/// Outcome of one resolution call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(PathBuf),
    Unresolvable(UnresolvableReason),
}

impl Resolution {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(path) => Some(path),
            Resolution::Unresolvable(_) => None,
        }
    }

    pub fn into_result(self) -> Result<PathBuf, UnresolvableReason> {
        match self {
            Resolution::Resolved(path) => Ok(path),
            Resolution::Unresolvable(reason) => Err(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Directory under which volumes are mounted by name
    pub volumes_root: PathBuf,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            volumes_root: PathBuf::from("/Volumes"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    options: ResolveOptions,
}

/// Resolve with default options
pub fn resolve(record: &AliasRecord, probe: Option<&dyn FileProbe>) -> Resolution {
    Resolver::default().resolve(record, probe)
}

impl Resolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn resolve(&self, record: &AliasRecord, probe: Option<&dyn FileProbe>) -> Resolution {
        debug!(
            volume = %record.volume_name,
            volume_created = ?record.volume_created().to_datetime(),
            target = %record.target_name,
            target_id = record.target_id,
            "resolving alias record"
        );

        let data = PathData::from_record(record);
        let mounts = self.mount_candidates(record, &data);

        match probe {
            None => Self::resolve_unverified(&data, &mounts),
            Some(probe) => Self::resolve_verified(record, &data, &mounts, probe),
        }
    }

    fn resolve_unverified(data: &PathData<'_>, mounts: &[PathBuf]) -> Resolution {
        if let Some(path) = data.direct_path() {
            debug!(path = %path.display(), "using recorded path without verification");
            return Resolution::Resolved(path);
        }
        if let (Some(components), Some(mount)) = (&data.hfs_components, mounts.first()) {
            let path = join_components(mount, components);
            debug!(path = %path.display(), "using reconstructed path without verification");
            return Resolution::Resolved(path);
        }
        Resolution::Unresolvable(UnresolvableReason::NoUsablePathData)
    }

    fn resolve_verified(
        record: &AliasRecord,
        data: &PathData<'_>,
        mounts: &[PathBuf],
        probe: &dyn FileProbe,
    ) -> Resolution {
        if let Some(path) = data.direct_path() {
            if probe.path_exists(&path) {
                return Resolution::Resolved(path);
            }
            debug!(path = %path.display(), "recorded path does not exist");
        }

        let live_mounts: Vec<&PathBuf> = mounts.iter().filter(|m| probe.path_exists(m)).collect();
        if live_mounts.is_empty() {
            debug!(candidates = ?mounts, "no mount location of the volume exists");
        }

        if let (Some(components), Some(mount)) = (&data.hfs_components, live_mounts.first()) {
            let path = join_components(mount, components);
            if probe.path_exists(&path) {
                return Resolution::Resolved(path);
            }
            debug!(path = %path.display(), "reconstructed path does not exist");
        }

        if let Some(path) = Self::match_by_identifier(record, data, &live_mounts, probe) {
            return Resolution::Resolved(path);
        }

        let reason = if !data.has_any() {
            UnresolvableReason::NoUsablePathData
        } else if live_mounts.is_empty() {
            UnresolvableReason::VolumeNotFound
        } else {
            UnresolvableReason::TargetNotFound
        };
        Resolution::Unresolvable(reason)
    }

    fn match_by_identifier(
        record: &AliasRecord,
        data: &PathData<'_>,
        mounts: &[&PathBuf],
        probe: &dyn FileProbe,
    ) -> Option<PathBuf> {
        if record.target_id == 0 {
            debug!("record has no target catalog id; skipping identifier matching");
            return None;
        }
        let wanted = u64::from(record.target_id);

        for mount in mounts {
            let Some(volume) = probe.identifier_of(mount) else {
                continue;
            };
            for candidate in data.candidates_under(mount) {
                match probe.identifier_of(&candidate) {
                    Some(found) if found.catalog_id == wanted && found.device == volume.device => {
                        debug!(path = %candidate.display(), "matched target by catalog id");
                        return Some(candidate);
                    }
                    Some(found) => debug!(
                        path = %candidate.display(),
                        catalog_id = found.catalog_id,
                        "candidate has a different identity"
                    ),
                    None => {}
                }
            }
        }
        None
    }

    /// Recorded mount point first, then `<volumes_root>/<volume name>`
    fn mount_candidates(&self, record: &AliasRecord, data: &PathData<'_>) -> Vec<PathBuf> {
        let mut mounts = Vec::with_capacity(2);
        if let Some(mount_point) = data.mount_point {
            mounts.push(PathBuf::from(mount_point));
        }
        if !record.volume_name.is_empty() {
            let by_name = self.options.volumes_root.join(hfs_to_posix_name(&record.volume_name));
            if !mounts.contains(&by_name) {
                mounts.push(by_name);
            }
        }
        mounts
    }
}

/// Path-bearing fields of a record, first occurrence of each tag only
struct PathData<'a> {
    posix_path: Option<&'a str>,
    mount_point: Option<&'a str>,
    hfs_components: Option<Vec<String>>,
    target_name: Option<&'a str>,
}

impl<'a> PathData<'a> {
    fn from_record(record: &'a AliasRecord) -> Self {
        let hfs_components = usable_text(record, tags::HFS_PATH).and_then(|path| {
            let components: Vec<String> = path
                .split(':')
                .skip(1)
                .filter(|component| !component.is_empty())
                .map(hfs_to_posix_name)
                .collect();
            (!components.is_empty()).then_some(components)
        });

        Self {
            posix_path: usable_text(record, tags::POSIX_PATH),
            mount_point: usable_text(record, tags::POSIX_MOUNT_POINT),
            hfs_components,
            target_name: Some(record.target_name.as_str()).filter(|name| !name.is_empty()),
        }
    }

    fn has_any(&self) -> bool {
        self.posix_path.is_some() || self.hfs_components.is_some() || self.target_name.is_some()
    }

    fn direct_path(&self) -> Option<PathBuf> {
        let posix = self.posix_path?;
        Some(match self.mount_point {
            Some(mount) if mount != "/" => join_under(Path::new(mount), posix),
            _ => PathBuf::from(posix),
        })
    }

    fn candidates_under(&self, mount: &Path) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(posix) = self.posix_path {
            candidates.push(join_under(mount, posix));
        }
        if let Some(components) = &self.hfs_components {
            candidates.push(join_components(mount, components));
        }
        if let Some(name) = self.target_name {
            candidates.push(mount.join(hfs_to_posix_name(name)));
        }
        candidates.dedup();
        candidates
    }
}

/// First entry for `tag` as non-empty UTF-8; anything else makes it unusable
fn usable_text(record: &AliasRecord, tag: u16) -> Option<&str> {
    let entry = record.first_entry(tag)?;
    match entry.text() {
        Some(text) if !text.is_empty() => Some(text),
        Some(_) => None,
        None => {
            debug!(
                tag = entry.tag_name().unwrap_or("unknown"),
                "ignoring entry whose payload is not valid UTF-8"
            );
            None
        }
    }
}

/// HFS names may contain `/`, which POSIX spells as `:`
fn hfs_to_posix_name(name: &str) -> String {
    name.replace('/', ":")
}

fn join_under(base: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}

fn join_components(base: &Path, components: &[String]) -> PathBuf {
    let mut path = base.to_path_buf();
    path.extend(components);
    path
}
