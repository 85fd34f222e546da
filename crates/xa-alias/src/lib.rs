// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Legacy alias records: decoding and path resolution
//!
//! An alias record is the tagged, big-endian blob the desktop shell stores
//! to find a file or folder again after it has been renamed or moved.
//! [`decode`] turns the bytes into an immutable [`AliasRecord`];
//! [`resolve`] turns that record into a path, optionally verifying
//! candidates through a caller-supplied [`FileProbe`].
//!
//! ```rust,ignore
//! let record = xa_alias::decode(&bytes)?;
//! match xa_alias::resolve(&record, None) {
//!     Resolution::Resolved(path) => println!("{}", path.display()),
//!     Resolution::Unresolvable(reason) => eprintln!("{reason}"),
//! }
//! ```

pub mod decode;
pub mod record;
pub mod resolve;
pub mod tags;

pub use decode::{ChecksumPolicy, DecodeError, DecodeOptions, decode, decode_with};
pub use record::{AliasKind, AliasRecord, ExtraEntry, MacTimestamp, VolumeIdentifier, VolumeKind};
pub use resolve::{
    FileIdentity, FileProbe, Resolution, ResolveOptions, Resolver, UnresolvableReason, resolve,
};
