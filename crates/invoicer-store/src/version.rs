//! Schema versions.
//!
//! A [`Version`] is a concrete `major.minor.patch` triple; it is what the
//! `version` table stores and what migration steps are selected by.  Match-any
//! components only exist on [`VersionPattern`], which has no textual form, so
//! a wildcard can never reach the database.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormatError;

/// The schema version compiled into this build.  Must match the workspace
/// package version.
pub const APP_VERSION: Version = Version::new(2, 3, 1);

/// Lowest version `full_downgrade` targets when no explicit version is given.
pub const DOWNGRADE_FLOOR: Version = Version::new(2, 0, 0);

/// An ordered `(major, minor, patch)` triple.
///
/// Ordering is lexicographic: major first, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Truncate to the `(major, minor)` pair.
    pub const fn major_minor(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    /// Compare with another version.  Same as [`Ord::cmp`].
    pub fn compare(&self, other: &Version) -> Ordering {
        self.cmp(other)
    }

    /// Parse the canonical `N.N.N` form.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let err = |reason| FormatError {
            text: text.to_string(),
            reason,
        };

        let mut parts = text.split('.');
        let mut next = || -> Result<u32, FormatError> {
            let part = parts.next().ok_or_else(|| err("expected three components"))?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err("components must be non-negative integers"));
            }
            part.parse().map_err(|_| err("component out of range"))
        };

        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err("expected three components"));
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// Component-wise difference between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionDelta {
    pub major: i64,
    pub minor: i64,
    pub patch: i64,
}

impl fmt::Display for VersionDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}.{:+}.{:+}", self.major, self.minor, self.patch)
    }
}

impl Sub for Version {
    type Output = VersionDelta;

    fn sub(self, rhs: Version) -> VersionDelta {
        VersionDelta {
            major: i64::from(self.major) - i64::from(rhs.major),
            minor: i64::from(self.minor) - i64::from(rhs.minor),
            patch: i64::from(self.patch) - i64::from(rhs.patch),
        }
    }
}

impl Add<VersionDelta> for Version {
    type Output = Version;

    /// Components that would leave the `u32` range are clamped.
    fn add(self, rhs: VersionDelta) -> Version {
        let shift = |c: u32, d: i64| (i64::from(c) + d).clamp(0, i64::from(u32::MAX)) as u32;
        Version::new(
            shift(self.major, rhs.major),
            shift(self.minor, rhs.minor),
            shift(self.patch, rhs.patch),
        )
    }
}

impl Add<Version> for VersionDelta {
    type Output = Version;

    fn add(self, rhs: Version) -> Version {
        rhs + self
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// A version with optional match-any components, used only for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionPattern {
    pub major: Option<u32>,
    pub minor: Option<u32>,
    pub patch: Option<u32>,
}

impl VersionPattern {
    pub const ANY: VersionPattern = VersionPattern::new(None, None, None);

    pub const fn new(major: Option<u32>, minor: Option<u32>, patch: Option<u32>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// `major.minor.*`
    pub const fn minor_series(major: u32, minor: u32) -> Self {
        Self::new(Some(major), Some(minor), None)
    }

    /// Compare component-wise, left to right; a wildcard equals anything.
    pub fn compare(&self, version: &Version) -> Ordering {
        let cmp = |p: Option<u32>, v: u32| p.map_or(Ordering::Equal, |p| p.cmp(&v));
        cmp(self.major, version.major)
            .then_with(|| cmp(self.minor, version.minor))
            .then_with(|| cmp(self.patch, version.patch))
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.compare(version) == Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_version_matches_package_version() {
        assert_eq!(APP_VERSION.to_string(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn parse_and_display() {
        let v = Version::parse("2.10.3").unwrap();
        assert_eq!(v, Version::new(2, 10, 3));
        assert_eq!(v.to_string(), "2.10.3");
        assert_eq!("0.0.0".parse::<Version>().unwrap(), Version::new(0, 0, 0));
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "2", "2.1", "2.1.", "2.1.0.4", "2.x.0", "-1.0.0", " 2.1.0", "2.1.0 ", "+2.1.0"] {
            assert!(Version::parse(bad).is_err(), "{bad:?} should not parse");
        }
        let err = Version::parse("99999999999.0.0").unwrap_err();
        assert_eq!(err.reason, "component out of range");
    }

    #[test]
    fn ordering_is_component_wise() {
        let a = Version::new(2, 0, 9);
        let b = Version::new(2, 1, 0);
        let c = Version::new(3, 0, 0);
        assert!(a < b && b < c && a < c);
        assert_eq!(b.compare(&b), Ordering::Equal);
        assert_eq!(c.compare(&a), Ordering::Greater);
        assert_eq!(b.major_minor(), (2, 1));
    }

    #[test]
    fn exactly_one_relation_holds() {
        let versions = [
            Version::new(0, 0, 0),
            Version::new(1, 9, 9),
            Version::new(2, 0, 0),
            Version::new(2, 0, 1),
            Version::new(2, 1, 0),
        ];
        for a in &versions {
            for b in &versions {
                let relations = [a < b, a == b, a > b];
                assert_eq!(relations.iter().filter(|r| **r).count(), 1);
            }
        }
    }

    #[test]
    fn difference_round_trips() {
        let a = Version::new(2, 3, 1);
        let b = Version::new(3, 0, 7);
        assert_eq!(a - b + b, a);
        assert_eq!(b - a + a, b);
        assert_eq!((b - a).to_string(), "+1.-3.+6");
    }

    #[test]
    fn delta_addition_commutes() {
        let base = Version::new(2, 0, 0);
        let delta = Version::new(2, 3, 1) - base;
        assert_eq!(delta + base, base + delta);
        let zero = Version::new(0, 0, 0);
        assert_eq!(zero - Version::new(1, 1, 1) + zero, zero);
    }

    #[test]
    fn pattern_wildcards_match_anything() {
        let series = VersionPattern::minor_series(2, 1);
        assert!(series.matches(&Version::new(2, 1, 0)));
        assert!(series.matches(&Version::new(2, 1, 42)));
        assert!(!series.matches(&Version::new(2, 2, 0)));
        assert_eq!(series.compare(&Version::new(2, 0, 5)), Ordering::Greater);
        assert_eq!(series.compare(&Version::new(3, 0, 0)), Ordering::Less);
        assert!(VersionPattern::ANY.matches(&Version::new(7, 7, 7)));
    }

    #[test]
    fn serde_uses_canonical_text() {
        let json = serde_json::to_string(&Version::new(2, 2, 0)).unwrap();
        assert_eq!(json, "\"2.2.0\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Version::new(2, 2, 0));
        assert!(serde_json::from_str::<Version>("\"2.2\"").is_err());
    }
}
