//! Version identifiers rendered as `"{major}.{minor}"`.

use std::fmt;
use std::str::FromStr;

use crate::{MdrError, Result};

/// A two-component version number.
///
/// Ordering is major first, then minor, so `1.2 < 1.10 < 2.0`. Serialized
/// as the string `"{major}.{minor}"`, matching the persisted wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    pub major: u32,
    pub minor: u32,
}

impl serde::Serialize for VersionNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for VersionNumber {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl VersionNumber {
    /// The version assigned to a freshly created draft.
    pub const INITIAL: Self = Self { major: 0, minor: 1 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Same major, minor + 1. Used for draft edits and new draft versions.
    pub fn next_minor(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor + 1,
        }
    }

    /// Major + 1, minor reset to 0. Used on approval.
    pub fn next_major(self) -> Self {
        Self {
            major: self.major + 1,
            minor: 0,
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for VersionNumber {
    type Err = MdrError;

    fn from_str(value: &str) -> Result<Self> {
        let malformed =
            || MdrError::Validation(format!("'{value}' is not a valid 'major.minor' version."));
        let (major, minor) = value.split_once('.').ok_or_else(malformed)?;
        // A leading '-' or '+' parses as an i/u-int sign; reject it explicitly.
        if !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
            || major.is_empty()
            || minor.is_empty()
        {
            return Err(malformed());
        }
        Ok(Self {
            major: major.parse().map_err(|_| malformed())?,
            minor: minor.parse().map_err(|_| malformed())?,
        })
    }
}
