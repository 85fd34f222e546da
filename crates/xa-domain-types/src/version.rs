// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Semantic versions as printed by developer tools
//!
//! Accepts a leading `v`, optional minor/patch components (defaulting to 0),
//! a `-pre.release` suffix and a `+build` suffix. Build metadata never takes
//! part in comparisons.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseVersionError {
    #[error("empty version string")]
    Empty,
    #[error("invalid numeric component `{0}`")]
    InvalidNumber(String),
    #[error("too many numeric components in `{0}`")]
    TooManyComponents(String),
    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<String>,
    pub build_metadata: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
            build_metadata: None,
        }
    }

    pub fn with_pre_release(mut self, pre_release: impl Into<String>) -> Self {
        self.pre_release = Some(pre_release.into());
        self
    }

    pub fn with_build_metadata(mut self, build_metadata: impl Into<String>) -> Self {
        self.build_metadata = Some(build_metadata.into());
        self
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre_release.is_some()
    }

    fn components(&self) -> [u64; 3] {
        [self.major, self.minor, self.patch]
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl std::hash::Hash for Version {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.components().hash(state);
        self.pre_release.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components()).then_with(|| {
            match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build_metadata {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        if s.is_empty() {
            return Err(ParseVersionError::Empty);
        }

        let (rest, build_metadata) = match s.split_once('+') {
            Some((rest, build)) => (rest, Some(parse_identifiers(build)?)),
            None => (s, None),
        };
        let (core, pre_release) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(parse_identifiers(pre)?)),
            None => (rest, None),
        };

        let mut numbers = [0_u64; 3];
        let mut count = 0;
        for part in core.split('.') {
            if count == numbers.len() {
                return Err(ParseVersionError::TooManyComponents(core.to_string()));
            }
            numbers[count] = parse_number(part)?;
            count += 1;
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre_release,
            build_metadata,
        })
    }
}

fn parse_number(part: &str) -> Result<u64, ParseVersionError> {
    let well_formed = !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && !(part.len() > 1 && part.starts_with('0'));
    if !well_formed {
        return Err(ParseVersionError::InvalidNumber(part.to_string()));
    }
    part.parse().map_err(|_| ParseVersionError::InvalidNumber(part.to_string()))
}

/// Dot-separated `[0-9A-Za-z-]+` identifiers
fn parse_identifiers(text: &str) -> Result<String, ParseVersionError> {
    let valid = text.split('.').all(|identifier| {
        !identifier.is_empty()
            && identifier.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    });
    if valid {
        Ok(text.to_string())
    } else {
        Err(ParseVersionError::InvalidIdentifier(text.to_string()))
    }
}
