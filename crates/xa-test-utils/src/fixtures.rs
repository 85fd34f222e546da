// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Alias record fixtures
//!
//! Assembles version 2 alias record buffers byte by byte so decoder and
//! resolver tests can describe their inputs field by field. Only used from
//! tests; production code never writes alias records.

pub const HEADER_LEN: usize = 150;
pub const CHECKSUM_OFFSET: usize = 140;
const CHECKSUM_COVERAGE_START: usize = CHECKSUM_OFFSET + 4;
const VOLUME_NAME_FIELD: usize = 28;
const TARGET_NAME_FIELD: usize = 64;
const END_OF_LIST: u16 = 0xFFFF;

/// Builder for big-endian version 2 alias record buffers
#[derive(Debug, Clone)]
pub struct AliasBlobBuilder {
    creator_code: [u8; 4],
    version: u16,
    kind: u16,
    volume_name: Vec<u8>,
    volume_created: u32,
    volume_signature: [u8; 2],
    volume_kind: u16,
    parent_id: u32,
    target_name: Vec<u8>,
    target_id: u32,
    target_created: u32,
    file_type: [u8; 4],
    file_creator: [u8; 4],
    entries: Vec<(u16, Vec<u8>)>,
    raw_tail: Vec<u8>,
    terminate: bool,
}

impl Default for AliasBlobBuilder {
    fn default() -> Self {
        Self {
            creator_code: [0; 4],
            version: 2,
            kind: 0,
            volume_name: b"Macintosh HD".to_vec(),
            volume_created: 0xD6A1_2B3C,
            volume_signature: *b"H+",
            volume_kind: 0,
            parent_id: 2,
            target_name: Vec::new(),
            target_id: 0,
            target_created: 0,
            file_type: [0; 4],
            file_creator: [0; 4],
            entries: Vec::new(),
            raw_tail: Vec::new(),
            terminate: true,
        }
    }
}

impl AliasBlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Raw kind value: 0 for files, 1 for folders
    pub fn kind(mut self, kind: u16) -> Self {
        self.kind = kind;
        self
    }

    pub fn creator_code(mut self, code: [u8; 4]) -> Self {
        self.creator_code = code;
        self
    }

    /// Header volume name; truncated to the 27 bytes the field holds
    pub fn volume_name(mut self, name: &str) -> Self {
        self.volume_name = name.as_bytes().iter().copied().take(VOLUME_NAME_FIELD - 1).collect();
        self
    }

    pub fn volume_created(mut self, seconds_since_1904: u32) -> Self {
        self.volume_created = seconds_since_1904;
        self
    }

    pub fn volume_signature(mut self, signature: [u8; 2]) -> Self {
        self.volume_signature = signature;
        self
    }

    pub fn volume_kind(mut self, kind: u16) -> Self {
        self.volume_kind = kind;
        self
    }

    pub fn parent_id(mut self, id: u32) -> Self {
        self.parent_id = id;
        self
    }

    /// Header target name; truncated to the 63 bytes the field holds
    pub fn target_name(mut self, name: &str) -> Self {
        self.target_name = name.as_bytes().iter().copied().take(TARGET_NAME_FIELD - 1).collect();
        self
    }

    pub fn target_id(mut self, id: u32) -> Self {
        self.target_id = id;
        self
    }

    pub fn target_created(mut self, seconds_since_1904: u32) -> Self {
        self.target_created = seconds_since_1904;
        self
    }

    pub fn file_type(mut self, file_type: [u8; 4], creator: [u8; 4]) -> Self {
        self.file_type = file_type;
        self.file_creator = creator;
        self
    }

    /// Append a tagged entry; odd-length payloads get a pad byte
    pub fn entry(mut self, tag: u16, payload: impl AsRef<[u8]>) -> Self {
        self.entries.push((tag, payload.as_ref().to_vec()));
        self
    }

    /// Append a text entry encoded as a UTF-16BE string with a character count prefix
    pub fn unicode_entry(self, tag: u16, text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let mut payload = Vec::with_capacity(2 + units.len() * 2);
        payload.extend_from_slice(&(units.len() as u16).to_be_bytes());
        for unit in units {
            payload.extend_from_slice(&unit.to_be_bytes());
        }
        self.entry(tag, payload)
    }

    /// Bytes written verbatim after the entries and before the end-of-list marker
    pub fn raw_tail(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.raw_tail.extend_from_slice(bytes.as_ref());
        self
    }

    /// Omit the end-of-list marker so the entry list ends with the buffer
    pub fn without_terminator(mut self) -> Self {
        self.terminate = false;
        self
    }

    /// Serialize the record, filling in its size and checksum
    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0_u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.creator_code);
        buf[6..8].copy_from_slice(&self.version.to_be_bytes());
        buf[8..10].copy_from_slice(&self.kind.to_be_bytes());
        write_pascal(&mut buf[10..10 + VOLUME_NAME_FIELD], &self.volume_name);
        buf[38..42].copy_from_slice(&self.volume_created.to_be_bytes());
        buf[42..44].copy_from_slice(&self.volume_signature);
        buf[44..46].copy_from_slice(&self.volume_kind.to_be_bytes());
        buf[46..50].copy_from_slice(&self.parent_id.to_be_bytes());
        write_pascal(&mut buf[50..50 + TARGET_NAME_FIELD], &self.target_name);
        buf[114..118].copy_from_slice(&self.target_id.to_be_bytes());
        buf[118..122].copy_from_slice(&self.target_created.to_be_bytes());
        buf[122..126].copy_from_slice(&self.file_type);
        buf[126..130].copy_from_slice(&self.file_creator);
        // levels from / to
        buf[130..132].copy_from_slice(&1_u16.to_be_bytes());
        buf[132..134].copy_from_slice(&1_u16.to_be_bytes());

        for (tag, payload) in &self.entries {
            buf.extend_from_slice(&tag.to_be_bytes());
            buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
            buf.extend_from_slice(payload);
            if payload.len() % 2 == 1 {
                buf.push(0);
            }
        }
        buf.extend_from_slice(&self.raw_tail);
        if self.terminate {
            buf.extend_from_slice(&END_OF_LIST.to_be_bytes());
            buf.extend_from_slice(&0_u16.to_be_bytes());
        }

        let size = buf.len() as u16;
        buf[4..6].copy_from_slice(&size.to_be_bytes());
        reseal(&mut buf);
        buf
    }
}

/// Recompute the checksum after a test has patched bytes of a built record
pub fn reseal(buf: &mut [u8]) {
    let size = usize::from(u16::from_be_bytes([buf[4], buf[5]])).min(buf.len());
    let crc = crc32c::crc32c(&buf[CHECKSUM_COVERAGE_START..size]);
    buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&crc.to_be_bytes());
}

fn write_pascal(field: &mut [u8], text: &[u8]) {
    field[0] = text.len() as u8;
    field[1..1 + text.len()].copy_from_slice(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[crate::logged_test]
    fn test_minimal_record_layout() {
        let buf = AliasBlobBuilder::new().build();
        logger.log(&format!("built {} bytes", buf.len())).unwrap();

        assert_eq!(buf.len(), HEADER_LEN + 4);
        assert_eq!(u16::from_be_bytes([buf[4], buf[5]]) as usize, buf.len());
        assert_eq!(u16::from_be_bytes([buf[6], buf[7]]), 2);
        assert_eq!(buf[10] as usize, "Macintosh HD".len());
        assert_eq!(&buf[HEADER_LEN..], &[0xFF, 0xFF, 0x00, 0x00]);
    }

    #[crate::logged_test]
    fn test_odd_payload_is_padded() {
        let buf = AliasBlobBuilder::new().entry(18, b"abc").build();
        // tag + length + 3 payload bytes + 1 pad + terminator
        assert_eq!(buf.len(), HEADER_LEN + 4 + 4 + 4);
        assert_eq!(buf[HEADER_LEN + 7], 0);
    }

    #[crate::logged_test]
    fn test_reseal_restores_checksum() {
        let mut buf = AliasBlobBuilder::new().entry(18, b"/tmp").build();
        let original = buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].to_vec();
        buf[HEADER_LEN + 4] = b'X';
        reseal(&mut buf);
        assert_ne!(buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4], original[..]);
    }
}
