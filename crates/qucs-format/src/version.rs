use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Format version this build reads and writes.
///
/// Documents declaring a newer version are rejected; older ones are accepted.
pub const FORMAT_VERSION: VersionTriplet = VersionTriplet::new(0, 1, 0);

/// A `MAJOR.MINOR.PATCH` version as found in document headers.
///
/// Ordering is lexicographic over (major, minor, patch), which is what the
/// derived `Ord` gives because of the field order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTriplet {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("malformed version '{0}': expected MAJOR.MINOR.PATCH")]
    MalformedVersion(String),
}

impl VersionTriplet {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a `N.N.N` string.
    ///
    /// Every component must be a non-empty run of ASCII digits without
    /// leading zeros, so an accepted string always formats back to itself.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let malformed = || VersionError::MalformedVersion(text.to_string());

        let mut parts = text.split('.');
        let mut next = || -> Result<u32, VersionError> {
            let part = parts.next().ok_or_else(malformed)?;
            if part.is_empty()
                || !part.bytes().all(|b| b.is_ascii_digit())
                || (part.len() > 1 && part.starts_with('0'))
            {
                return Err(malformed());
            }
            part.parse().map_err(|_| malformed())
        };

        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(version)
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    /// A document is usable iff its version does not exceed the running one.
    pub fn is_readable_by(&self, running: &Self) -> bool {
        self.compare(running) != Ordering::Greater
    }
}

impl FromStr for VersionTriplet {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionTriplet {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionTriplet> for String {
    fn from(version: VersionTriplet) -> Self {
        version.to_string()
    }
}

impl fmt::Display for VersionTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
