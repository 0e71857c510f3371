//! CMake version numbers
//!
//! CMake versions are dotted tuples of 2 to 4 numeric components
//! (`3.16`, `3.16.4`, `3.16.4.1`). They are not semver: no pre-release or
//! build metadata, and missing components compare as zero. The strict
//! parser rejects anything else, which is what
//! `cmake_minimum_required(VERSION ...)` requires; the lenient parser is
//! used by `if(... VERSION_LESS ...)` where CMake tolerates trailing
//! garbage by truncating at the first non-numeric component.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A 2-to-4 component CMake version, normalized to four fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CmakeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub tweak: u32,
}

impl CmakeVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32, tweak: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            tweak,
        }
    }

    /// Strict parse: 2 to 4 dot-separated decimal components, nothing else.
    #[must_use]
    pub fn parse_strict(input: &str) -> Option<Self> {
        if input.is_empty() {
            return None;
        }
        let mut values = [0u32; 4];
        let mut count = 0usize;
        for part in input.split('.') {
            if count >= 4 || part.is_empty() {
                return None;
            }
            values[count] = part.parse::<u32>().ok()?;
            count += 1;
        }
        if !(2..=4).contains(&count) {
            return None;
        }
        Some(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Lenient parse for version comparisons: leading numeric components
    /// are taken, the rest ignored. A single component is accepted.
    #[must_use]
    pub fn parse_lenient(input: &str) -> Option<Self> {
        let mut values = [0u32; 4];
        let mut count = 0usize;
        for part in input.split('.') {
            if count >= 4 {
                break;
            }
            match part.parse::<u32>() {
                Ok(v) => {
                    values[count] = v;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        if count == 0 {
            return None;
        }
        Some(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Parse a `<min>[...<max>]` range token. Returns `(min, max)` where
    /// `max` is `None` when no `...` separator is present.
    #[must_use]
    pub fn parse_range_strict(input: &str) -> Option<(Self, Option<Self>)> {
        if let Some(pos) = input.find("...") {
            let min_tok = &input[..pos];
            let max_tok = &input[pos + 3..];
            // A second separator is malformed.
            if max_tok.contains("...") {
                return None;
            }
            let min = Self::parse_strict(min_tok)?;
            let max = Self::parse_strict(max_tok)?;
            Some((min, Some(max)))
        } else {
            Some((Self::parse_strict(input)?, None))
        }
    }
}

impl PartialOrd for CmakeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CmakeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.tweak).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.tweak,
        ))
    }
}

impl fmt::Display for CmakeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tweak != 0 {
            write!(
                f,
                "{}.{}.{}.{}",
                self.major, self.minor, self.patch, self.tweak
            )
        } else if self.patch != 0 {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            write!(f, "{}.{}", self.major, self.minor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_accepts_two_to_four_components() {
        assert_eq!(
            CmakeVersion::parse_strict("3.16"),
            Some(CmakeVersion::new(3, 16, 0, 0))
        );
        assert_eq!(
            CmakeVersion::parse_strict("3.16.4.1"),
            Some(CmakeVersion::new(3, 16, 4, 1))
        );
        assert!(CmakeVersion::parse_strict("3").is_none());
        assert!(CmakeVersion::parse_strict("3.16.4.1.9").is_none());
        assert!(CmakeVersion::parse_strict("3.").is_none());
        assert!(CmakeVersion::parse_strict("3.x").is_none());
        assert!(CmakeVersion::parse_strict("").is_none());
    }

    #[test]
    fn lenient_truncates() {
        assert_eq!(
            CmakeVersion::parse_lenient("1.2.3rc1"),
            Some(CmakeVersion::new(1, 2, 0, 0))
        );
        assert_eq!(
            CmakeVersion::parse_lenient("9"),
            Some(CmakeVersion::new(9, 0, 0, 0))
        );
        assert!(CmakeVersion::parse_lenient("abc").is_none());
    }

    #[test]
    fn range_parse() {
        let (min, max) = CmakeVersion::parse_range_strict("3.16...3.29").unwrap();
        assert_eq!(min, CmakeVersion::new(3, 16, 0, 0));
        assert_eq!(max, Some(CmakeVersion::new(3, 29, 0, 0)));

        let (min, max) = CmakeVersion::parse_range_strict("3.10").unwrap();
        assert_eq!(min, CmakeVersion::new(3, 10, 0, 0));
        assert!(max.is_none());

        assert!(CmakeVersion::parse_range_strict("3.16...").is_none());
        assert!(CmakeVersion::parse_range_strict("...3.16").is_none());
    }

    #[test]
    fn ordering() {
        let a = CmakeVersion::new(3, 16, 0, 0);
        let b = CmakeVersion::new(3, 21, 0, 0);
        assert!(a < b);
        assert!(CmakeVersion::new(3, 16, 0, 1) > a);
    }

    #[test]
    fn display_trims_zero_tail() {
        assert_eq!(CmakeVersion::new(3, 16, 0, 0).to_string(), "3.16");
        assert_eq!(CmakeVersion::new(3, 16, 4, 0).to_string(), "3.16.4");
        assert_eq!(CmakeVersion::new(3, 16, 4, 1).to_string(), "3.16.4.1");
    }
}
