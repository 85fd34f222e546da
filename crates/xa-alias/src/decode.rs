// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Alias record decoder
//!
//! Version 2 layout, every multi-byte integer big-endian:
//!
//! | offset | size | field                                   |
//! |-------:|-----:|-----------------------------------------|
//! |      0 |    4 | creator code                            |
//! |      4 |    2 | record size                             |
//! |      6 |    2 | record version                          |
//! |      8 |    2 | kind                                    |
//! |     10 |   28 | volume name (Pascal string)             |
//! |     38 |    4 | volume creation date                    |
//! |     42 |    2 | volume signature                        |
//! |     44 |    2 | volume device kind                      |
//! |     46 |    4 | parent folder catalog id                |
//! |     50 |   64 | target name (Pascal string)             |
//! |    114 |    4 | target catalog id                       |
//! |    118 |    4 | target creation date                    |
//! |    122 |    4 | file type                               |
//! |    126 |    4 | file creator                            |
//! |    130 |    2 | levels from                             |
//! |    132 |    2 | levels to                               |
//! |    134 |    4 | volume attributes                       |
//! |    138 |    2 | volume filesystem id                    |
//! |    140 |    4 | CRC-32C of bytes `144..record_size`     |
//! |    144 |    6 | reserved                                |
//! |    150 |    … | tagged entries                          |
//!
//! Each entry is `tag: u16, length: u16, payload`, padded to an even
//! boundary, until tag `0xFFFF` or the end of the record.

use thiserror::Error;
use tracing::{debug, warn};

use crate::record::{
    AliasKind, AliasRecord, ExtraEntry, MacTimestamp, VolumeIdentifier, VolumeKind,
};
use crate::tags;

/// Size of the fixed header; shorter buffers cannot be alias records.
pub const HEADER_LEN: usize = 150;
pub const SUPPORTED_VERSIONS: &[u16] = &[2];

const CHECKSUM_OFFSET: usize = 140;
const CHECKSUM_COVERAGE_START: usize = CHECKSUM_OFFSET + 4;
const ENTRY_HEADER_LEN: usize = 4;

/// Structural decode failures; all are deterministic in the input bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("alias record too short: need {needed} bytes, have {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("unsupported alias record version {0}")]
    UnsupportedVersion(u16),

    #[error("alias record checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error(
        "truncated entry at offset {offset} (tag {tag:?}): declared {declared} bytes, {available} available"
    )]
    TruncatedEntry {
        offset: usize,
        tag: Option<u16>,
        declared: usize,
        available: usize,
    },

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

/// What to do when the stored checksum does not match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Reject the record
    #[default]
    Strict,
    /// Log a warning and keep decoding
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub checksum: ChecksumPolicy,
}

impl DecodeOptions {
    pub fn lenient() -> Self {
        Self {
            checksum: ChecksumPolicy::Lenient,
        }
    }
}

/// Decode with strict checksum verification
pub fn decode(bytes: &[u8]) -> Result<AliasRecord, DecodeError> {
    decode_with(bytes, DecodeOptions::default())
}

/// Decode an alias record from `bytes`
pub fn decode_with(bytes: &[u8], options: DecodeOptions) -> Result<AliasRecord, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::TooShort {
            needed: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let record_size = read_be_u16(bytes, 4);
    let size = usize::from(record_size);
    if size > bytes.len() {
        return Err(DecodeError::TooShort {
            needed: size,
            actual: bytes.len(),
        });
    }
    if size < HEADER_LEN {
        return Err(DecodeError::InvalidField {
            field: "record_size",
            reason: "smaller than the fixed header",
        });
    }
    // Anything past the declared size belongs to whoever stored the blob.
    let record = &bytes[..size];

    let record_version = read_be_u16(record, 6);
    if !SUPPORTED_VERSIONS.contains(&record_version) {
        return Err(DecodeError::UnsupportedVersion(record_version));
    }

    let checksum = read_be_u32(record, CHECKSUM_OFFSET);
    verify_checksum(record, checksum, options.checksum)?;

    let kind = AliasKind::from_raw(read_be_u16(record, 8)).ok_or(DecodeError::InvalidField {
        field: "kind",
        reason: "must be 0 (file) or 1 (folder)",
    })?;
    let header_volume_name = read_pascal(&record[10..38], "volume_name")?;
    let header_target_name = read_pascal(&record[50..114], "target_name")?;

    let extra_entries = read_entries(record)?;

    let unicode = |tag| {
        extra_entries
            .iter()
            .find(|entry| entry.tag == tag)
            .and_then(ExtraEntry::unicode_text)
            .filter(|text| !text.is_empty())
    };
    let volume_name = unicode(tags::UNICODE_VOLUME_NAME).unwrap_or(header_volume_name);
    let target_name = unicode(tags::UNICODE_TARGET_NAME).unwrap_or(header_target_name);

    debug!(
        version = record_version,
        entries = extra_entries.len(),
        volume = %volume_name,
        target = %target_name,
        "decoded alias record"
    );

    Ok(AliasRecord {
        record_version,
        kind,
        volume_name,
        volume_creation_date: MacTimestamp(u64::from(read_be_u32(record, 38))),
        volume_identifier: VolumeIdentifier {
            device_kind: VolumeKind::from_raw(read_be_u16(record, 44)),
            signature: read_fixed::<2>(record, 42),
        },
        parent_folder_id: read_be_u32(record, 46),
        target_name,
        target_id: read_be_u32(record, 114),
        extra_entries,
        checksum,
        creator_code: read_fixed::<4>(record, 0),
        record_size,
        target_creation_date: MacTimestamp(u64::from(read_be_u32(record, 118))),
        file_type: read_fixed::<4>(record, 122),
        file_creator: read_fixed::<4>(record, 126),
        levels_from: read_be_u16(record, 130),
        levels_to: read_be_u16(record, 132),
        volume_attributes: read_be_u32(record, 134),
        volume_fs_id: read_be_u16(record, 138),
    })
}

fn verify_checksum(record: &[u8], stored: u32, policy: ChecksumPolicy) -> Result<(), DecodeError> {
    let computed = crc32c::crc32c(&record[CHECKSUM_COVERAGE_START..]);
    if computed == stored {
        return Ok(());
    }
    match policy {
        ChecksumPolicy::Strict => Err(DecodeError::ChecksumMismatch { stored, computed }),
        ChecksumPolicy::Lenient => {
            warn!(
                stored = format_args!("{stored:#010x}"),
                computed = format_args!("{computed:#010x}"),
                "alias record checksum mismatch accepted in lenient mode"
            );
            Ok(())
        }
    }
}

fn read_entries(record: &[u8]) -> Result<Vec<ExtraEntry>, DecodeError> {
    let mut entries = Vec::new();
    let mut offset = HEADER_LEN;

    while offset < record.len() {
        let remaining = record.len() - offset;
        // A bare end marker may close the record without a length field.
        if remaining >= 2 && read_be_u16(record, offset) == tags::END_OF_LIST {
            break;
        }
        if remaining < ENTRY_HEADER_LEN {
            return Err(DecodeError::TruncatedEntry {
                offset,
                tag: None,
                declared: ENTRY_HEADER_LEN,
                available: remaining,
            });
        }

        let tag = read_be_u16(record, offset);
        let length = usize::from(read_be_u16(record, offset + 2));
        let payload_start = offset + ENTRY_HEADER_LEN;
        let available = record.len() - payload_start;
        if length > available {
            return Err(DecodeError::TruncatedEntry {
                offset,
                tag: Some(tag),
                declared: length,
                available,
            });
        }

        entries.push(ExtraEntry {
            tag,
            payload: record[payload_start..payload_start + length].to_vec(),
        });

        // The pad byte after a final odd-length payload may be missing.
        offset = (payload_start + length + (length & 1)).min(record.len());
    }

    Ok(entries)
}

/// Length-prefixed 8-bit string filling a fixed-size field
fn read_pascal(field: &[u8], name: &'static str) -> Result<String, DecodeError> {
    let len = usize::from(field[0]);
    if len >= field.len() {
        return Err(DecodeError::InvalidField {
            field: name,
            reason: "length byte exceeds field size",
        });
    }
    Ok(String::from_utf8_lossy(&field[1..1 + len]).into_owned())
}

// Callers bounds-check against HEADER_LEN or the entry loop before reading.
fn read_be_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(read_fixed::<2>(buf, offset))
}

fn read_be_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(read_fixed::<4>(buf, offset))
}

fn read_fixed<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0_u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}
