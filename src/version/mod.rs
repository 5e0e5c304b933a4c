// src/version/mod.rs

//! Version ordering and version requests
//!
//! Versions in build metadata are free-form strings ("1.2.3", "2.0",
//! "1.4.0-M3"). Comparison uses semver when the string parses as semver and
//! falls back to a lenient numeric extraction otherwise, so that ordering is
//! total and deterministic for every pair of versions the resolver meets.

use crate::error::{Error, Result};
use semver::Version as SemVersion;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A module version as declared in metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalize to a semver version for comparison
    ///
    /// Versions that are not semver-compliant ("2.0", "1.4.RELEASE") get
    /// their leading numeric segments extracted into major.minor.patch.
    fn to_semver(&self) -> SemVersion {
        if let Ok(v) = SemVersion::parse(&self.0) {
            return v;
        }

        let parts: Vec<&str> = self.0.split(['.', '-', '+']).collect();
        let major = parts.first().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let minor = parts.get(1).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let patch = parts.get(2).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

        SemVersion::new(major, minor, patch)
    }

    /// Compare two versions
    ///
    /// Semver comparison first; the raw string breaks ties so that distinct
    /// representations ("1.0" vs "1.0.0") still order deterministically.
    pub fn compare(&self, other: &Version) -> Ordering {
        match self.to_semver().cmp(&other.to_semver()) {
            Ordering::Equal => self.0.cmp(&other.0),
            ord => ord,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidInput("empty version".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A version request attached to a dependency declaration
///
/// Declared exact versions are reconciliation *preferences*: the engine
/// picks the highest declared version per module, and a lower exact request
/// is silently bumped (that is what `DontBumpRootDependencies` polices).
/// Lower bounds propose their pivot as a candidate; upper bounds constrain
/// reconciliation without proposing one, and a selection that violates an
/// upper bound is reported as a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionRequest {
    /// Any version is acceptable
    Any,
    /// The declared version itself
    Exact(Version),
    /// Greater than or equal
    AtLeast(Version),
    /// Less than or equal
    AtMost(Version),
}

impl VersionRequest {
    /// Parse a version request string
    ///
    /// Examples:
    /// - "1.2.3" → Exact(1.2.3)
    /// - ">= 1.2" → AtLeast(1.2)
    /// - "<= 2.0" → AtMost(2.0)
    /// - "*" or "" → Any
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(VersionRequest::Any);
        }

        if let Some(rest) = s.strip_prefix(">=") {
            Ok(VersionRequest::AtLeast(rest.trim().parse()?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(VersionRequest::AtMost(rest.trim().parse()?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(VersionRequest::Exact(rest.trim().parse()?))
        } else {
            Ok(VersionRequest::Exact(s.parse()?))
        }
    }

    /// Check if a version satisfies this request
    pub fn satisfies(&self, version: &Version) -> bool {
        match self {
            VersionRequest::Any => true,
            VersionRequest::Exact(v) => version == v,
            VersionRequest::AtLeast(v) => version >= v,
            VersionRequest::AtMost(v) => version <= v,
        }
    }

    /// The version this request proposes as a selection candidate
    ///
    /// Upper bounds propose nothing: they only constrain what other
    /// declarations propose.
    pub fn candidate(&self) -> Option<&Version> {
        match self {
            VersionRequest::Any | VersionRequest::AtMost(_) => None,
            VersionRequest::Exact(v) | VersionRequest::AtLeast(v) => Some(v),
        }
    }

    /// Whether the declared version is a reconcilable preference rather
    /// than a bound
    pub fn is_preference(&self) -> bool {
        matches!(self, VersionRequest::Any | VersionRequest::Exact(_))
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequest::Any => write!(f, "*"),
            VersionRequest::Exact(v) => write!(f, "{}", v),
            VersionRequest::AtLeast(v) => write!(f, ">= {}", v),
            VersionRequest::AtMost(v) => write!(f, "<= {}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::new(s)
    }

    #[test]
    fn test_version_compare_semver() {
        assert!(v("1.2.3") < v("1.2.4"));
        assert!(v("2.0.0") > v("1.9.9"));
        assert_eq!(v("1.2.3").compare(&v("1.2.3")), Ordering::Equal);
    }

    #[test]
    fn test_version_compare_short_forms() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.10") > v("1.9"));
    }

    #[test]
    fn test_version_compare_mixed_forms() {
        // "2.0" is not semver-compliant but must still order above "1.9.9"
        assert!(v("2.0") > v("1.9.9"));
        assert!(v("1.4.RELEASE") < v("1.5.RELEASE"));
    }

    #[test]
    fn test_version_compare_tie_break_is_deterministic() {
        assert!(v("1.0") < v("1.0.0"));
        assert!(v("1.0.0") > v("1.0"));
    }

    #[test]
    fn test_version_from_str_rejects_empty() {
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_request_parse_exact() {
        let r = VersionRequest::parse("1.2.3").unwrap();
        assert_eq!(r, VersionRequest::Exact(v("1.2.3")));
        assert!(r.satisfies(&v("1.2.3")));
        assert!(!r.satisfies(&v("1.2.4")));
    }

    #[test]
    fn test_request_parse_bounds() {
        let r = VersionRequest::parse(">= 1.2").unwrap();
        assert!(r.satisfies(&v("1.2")));
        assert!(r.satisfies(&v("2.0")));
        assert!(!r.satisfies(&v("1.1")));

        let r = VersionRequest::parse("<= 2.0").unwrap();
        assert!(r.satisfies(&v("1.9")));
        assert!(r.satisfies(&v("2.0")));
        assert!(!r.satisfies(&v("2.1")));
    }

    #[test]
    fn test_request_parse_any() {
        assert_eq!(VersionRequest::parse("*").unwrap(), VersionRequest::Any);
        assert_eq!(VersionRequest::parse("").unwrap(), VersionRequest::Any);
        assert!(VersionRequest::Any.satisfies(&v("99.99")));
    }

    #[test]
    fn test_request_candidate() {
        assert_eq!(VersionRequest::Any.candidate(), None);
        assert_eq!(VersionRequest::AtMost(v("2.0")).candidate(), None);
        assert_eq!(
            VersionRequest::AtLeast(v("1.2")).candidate(),
            Some(&v("1.2"))
        );
        assert_eq!(
            VersionRequest::Exact(v("1.2")).candidate(),
            Some(&v("1.2"))
        );
    }

    #[test]
    fn test_request_display_round_trip() {
        for s in ["*", "1.2.3", ">= 1.0", "<= 2.0"] {
            let r = VersionRequest::parse(s).unwrap();
            assert_eq!(VersionRequest::parse(&r.to_string()).unwrap(), r);
        }
    }
}
