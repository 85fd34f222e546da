// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Decoded alias record types
//!
//! An [`AliasRecord`] is only ever produced whole by [`crate::decode`] and is
//! read-only afterwards.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::tags;

/// Seconds between 1904-01-01 and 1970-01-01.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Whether the alias points at a file or a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasKind {
    File,
    Folder,
}

impl AliasKind {
    pub(crate) fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(AliasKind::File),
            1 => Some(AliasKind::Folder),
            _ => None,
        }
    }
}

/// Physical kind of the volume the target was recorded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeKind {
    FixedDisk,
    Network,
    Floppy400K,
    Floppy800K,
    Floppy1440K,
    Ejectable,
    Other(u16),
}

impl VolumeKind {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => VolumeKind::FixedDisk,
            1 => VolumeKind::Network,
            2 => VolumeKind::Floppy400K,
            3 => VolumeKind::Floppy800K,
            4 => VolumeKind::Floppy1440K,
            5 => VolumeKind::Ejectable,
            other => VolumeKind::Other(other),
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            VolumeKind::FixedDisk => 0,
            VolumeKind::Network => 1,
            VolumeKind::Floppy400K => 2,
            VolumeKind::Floppy800K => 3,
            VolumeKind::Floppy1440K => 4,
            VolumeKind::Ejectable => 5,
            VolumeKind::Other(raw) => raw,
        }
    }
}

/// Opaque equality key for a volume; not a path and not a live device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VolumeIdentifier {
    pub device_kind: VolumeKind,
    #[serde(serialize_with = "serialize_code")]
    pub signature: [u8; 2],
}

/// Seconds since 1904-01-01T00:00:00Z
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacTimestamp(pub u64);

impl MacTimestamp {
    /// Decode a 48.16 fixed-point high-resolution date
    pub fn from_high_res(raw: u64) -> Self {
        MacTimestamp(raw >> 16)
    }

    /// `None` for the zero "unset" value
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.0 == 0 {
            return None;
        }
        let unix = i64::try_from(self.0).ok()?.checked_sub(MAC_EPOCH_OFFSET)?;
        DateTime::from_timestamp(unix, 0)
    }
}

impl Serialize for MacTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_datetime() {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}

/// One `(tag, payload)` pair from the variable section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraEntry {
    pub tag: u16,
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Vec<u8>,
}

impl ExtraEntry {
    pub fn tag_name(&self) -> Option<&'static str> {
        tags::name(self.tag)
    }

    /// Payload as UTF-8 with trailing NUL padding removed
    pub fn text(&self) -> Option<&str> {
        let end = self.payload.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        std::str::from_utf8(&self.payload[..end]).ok()
    }

    /// Payload as a UTF-16BE string prefixed by its code unit count
    pub fn unicode_text(&self) -> Option<String> {
        let (count, rest) = self.payload.split_first_chunk::<2>()?;
        let units = usize::from(u16::from_be_bytes(*count));
        let bytes = rest.get(..units * 2)?;
        let units: Vec<u16> =
            bytes.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        String::from_utf16(&units).ok()
    }

    /// Payload as a big-endian u64 (high-resolution dates)
    pub fn be_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.payload.get(..8)?.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }
}

/// A fully decoded alias record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRecord {
    pub record_version: u16,
    pub kind: AliasKind,
    pub volume_name: String,
    pub volume_creation_date: MacTimestamp,
    pub volume_identifier: VolumeIdentifier,
    pub parent_folder_id: u32,
    pub target_name: String,
    pub target_id: u32,
    pub extra_entries: Vec<ExtraEntry>,
    pub checksum: u32,

    #[serde(serialize_with = "serialize_code")]
    pub creator_code: [u8; 4],
    pub record_size: u16,
    pub target_creation_date: MacTimestamp,
    #[serde(serialize_with = "serialize_code")]
    pub file_type: [u8; 4],
    #[serde(serialize_with = "serialize_code")]
    pub file_creator: [u8; 4],
    pub levels_from: u16,
    pub levels_to: u16,
    pub volume_attributes: u32,
    pub volume_fs_id: u16,
}

impl AliasRecord {
    /// First entry carrying `tag`; later duplicates are ignored
    pub fn first_entry(&self, tag: u16) -> Option<&ExtraEntry> {
        self.extra_entries.iter().find(|entry| entry.tag == tag)
    }

    /// Volume creation date, preferring the high-resolution entry
    pub fn volume_created(&self) -> MacTimestamp {
        self.first_entry(tags::HIGH_RES_VOLUME_CREATED)
            .and_then(ExtraEntry::be_u64)
            .map(MacTimestamp::from_high_res)
            .unwrap_or(self.volume_creation_date)
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Four-character style codes print as text when printable, hex otherwise
fn serialize_code<S: Serializer, const N: usize>(
    code: &[u8; N],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if code.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        serializer.serialize_str(&String::from_utf8_lossy(code))
    } else {
        serializer.serialize_str(&hex::encode(code))
    }
}
