//! Language versions and the half-open ranges used to gate declarations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// A `major.minor[.patch]` language version. Ordering is numeric per part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl LanguageVersion {
    /// Newest version known to the declaration tables.
    pub const LATEST: LanguageVersion = LanguageVersion::new(7, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        LanguageVersion {
            major,
            minor,
            patch: 0,
        }
    }
}

impl Default for LanguageVersion {
    fn default() -> Self {
        LanguageVersion::LATEST
    }
}

impl fmt::Display for LanguageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

impl FromStr for LanguageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('.');
        let mut next = |required: bool| -> Result<u16, VersionError> {
            match parts.next() {
                Some(p) => p.parse::<u16>().map_err(|_| VersionError::Invalid {
                    text: trimmed.to_owned(),
                }),
                None if required => Err(VersionError::Invalid {
                    text: trimmed.to_owned(),
                }),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(VersionError::Invalid {
                text: trimmed.to_owned(),
            });
        }
        Ok(LanguageVersion {
            major,
            minor,
            patch,
        })
    }
}

impl TryFrom<String> for LanguageVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LanguageVersion> for String {
    fn from(v: LanguageVersion) -> Self {
        v.to_string()
    }
}

/// `min` inclusive, `max` exclusive; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<LanguageVersion>,
    pub max: Option<LanguageVersion>,
}

impl VersionRange {
    pub const ALL: VersionRange = VersionRange {
        min: None,
        max: None,
    };

    pub const fn since(major: u16, minor: u16) -> Self {
        VersionRange {
            min: Some(LanguageVersion::new(major, minor)),
            max: None,
        }
    }

    pub const fn before(major: u16, minor: u16) -> Self {
        VersionRange {
            min: None,
            max: Some(LanguageVersion::new(major, minor)),
        }
    }

    pub fn contains(&self, version: LanguageVersion) -> bool {
        self.min.map_or(true, |min| version >= min) && self.max.map_or(true, |max| version < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_and_three_part_versions() {
        assert_eq!(
            "3.1".parse::<LanguageVersion>().unwrap(),
            LanguageVersion::new(3, 1)
        );
        let v: LanguageVersion = "6.1.1".parse().unwrap();
        assert_eq!((v.major, v.minor, v.patch), (6, 1, 1));
        assert_eq!(v.to_string(), "6.1.1");
        assert_eq!("7".parse::<LanguageVersion>().unwrap(), LanguageVersion::new(7, 0));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<LanguageVersion>().is_err());
        assert!("six".parse::<LanguageVersion>().is_err());
        assert!("1.2.3.4".parse::<LanguageVersion>().is_err());
    }

    #[test]
    fn range_max_is_exclusive() {
        let r = VersionRange::before(3, 0);
        assert!(r.contains(LanguageVersion::new(2, 9)));
        assert!(!r.contains(LanguageVersion::new(3, 0)));
        let r = VersionRange::since(6, 0);
        assert!(r.contains(LanguageVersion::new(6, 0)));
        assert!(!r.contains(LanguageVersion::new(5, 1)));
        assert!(VersionRange::ALL.contains(LanguageVersion::LATEST));
    }
}
