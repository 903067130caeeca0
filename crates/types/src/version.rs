//! Loose versions and version range parsing
//!
//! Recipe and compiler versions are dotted numerals with one to three
//! components (`7`, `7.5`, `5.5.0`, `192`). Missing components are zero, so
//! `8`, `8.0` and `8.0.0` compare equal.
//!
//! Ranges are lists of constraints separated by whitespace or commas:
//! - `==1.2.3` / `1.2.3` - Exact version
//! - `>=1.2.0` - Minimum version
//! - `<=2.0.0` - Maximum version
//! - `~=1.2` - Compatible release (>=1.2,<2)
//! - `~=1.2.3` - Compatible release (>=1.2.3,<1.3)
//! - `!=1.5.0` - Exclude version
//! - Multiple constraints: `>=2.12.5 <3`

use kiln_errors::VersionError;
use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parse a loose dotted version into a `semver::Version`
///
/// # Errors
///
/// Returns `VersionError::InvalidVersion` when the input is empty, has more
/// than three components, or a component is not a number.
pub fn parse_loose(input: &str) -> Result<Version, VersionError> {
    let trimmed = input.trim();
    let invalid = || VersionError::InvalidVersion {
        input: input.to_string(),
    };

    let (numbers, pre) = match trimmed.split_once('-') {
        Some((numbers, pre)) => (numbers, Some(pre)),
        None => (trimmed, None),
    };

    let mut parts = [0u64; 3];
    let mut count = 0;
    for component in numbers.split('.') {
        if count == 3 || component.is_empty() {
            return Err(invalid());
        }
        parts[count] = component.parse().map_err(|_| invalid())?;
        count += 1;
    }

    let mut version = Version::new(parts[0], parts[1], parts[2]);
    if let Some(pre) = pre {
        version.pre = Prerelease::new(pre).map_err(|_| invalid())?;
    }
    Ok(version)
}

/// A single version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionConstraint {
    Exact(Version),
    GreaterEqual(Version),
    LessEqual(Version),
    Greater(Version),
    Less(Version),
    /// Compatible release; `precision` is the number of components written
    Compatible { version: Version, precision: u8 },
    NotEqual(Version),
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version == v,
            Self::GreaterEqual(v) => version >= v,
            Self::LessEqual(v) => version <= v,
            Self::Greater(v) => version > v,
            Self::Less(v) => version < v,
            Self::NotEqual(v) => version != v,
            Self::Compatible { version: v, precision } => {
                if version < v {
                    return false;
                }
                match precision {
                    0 | 1 => true,
                    2 => version.major == v.major,
                    _ => version.major == v.major && version.minor == v.minor,
                }
            }
        }
    }

    /// Parse a single constraint from a string
    fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();

        if let Some(rest) = s.strip_prefix("==") {
            Ok(Self::Exact(parse_loose(rest)?))
        } else if let Some(rest) = s.strip_prefix(">=") {
            Ok(Self::GreaterEqual(parse_loose(rest)?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(Self::LessEqual(parse_loose(rest)?))
        } else if let Some(rest) = s.strip_prefix("!=") {
            Ok(Self::NotEqual(parse_loose(rest)?))
        } else if let Some(rest) = s.strip_prefix("~=") {
            let precision = rest.trim().split('-').next().unwrap_or_default().split('.').count();
            Ok(Self::Compatible {
                version: parse_loose(rest)?,
                precision: u8::try_from(precision).unwrap_or(u8::MAX),
            })
        } else if let Some(rest) = s.strip_prefix('>') {
            Ok(Self::Greater(parse_loose(rest)?))
        } else if let Some(rest) = s.strip_prefix('<') {
            Ok(Self::Less(parse_loose(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(Self::Exact(parse_loose(rest)?))
        } else if s.starts_with(|c: char| c.is_ascii_digit()) {
            Ok(Self::Exact(parse_loose(s)?))
        } else {
            Err(VersionError::InvalidConstraint {
                input: s.to_string(),
            })
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "=={v}"),
            Self::GreaterEqual(v) => write!(f, ">={v}"),
            Self::LessEqual(v) => write!(f, "<={v}"),
            Self::Greater(v) => write!(f, ">{v}"),
            Self::Less(v) => write!(f, "<{v}"),
            Self::Compatible { version, .. } => write!(f, "~={version}"),
            Self::NotEqual(v) => write!(f, "!={v}"),
        }
    }
}

/// A version range made of zero or more constraints, all of which must hold
///
/// Serialized in its textual form (`">=2.12.5 <3.0.0"`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionRange {
    constraints: Vec<VersionConstraint>,
}

impl VersionRange {
    /// A range that accepts every version
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Create an exact version range
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            constraints: vec![VersionConstraint::Exact(version)],
        }
    }

    /// Check if a version satisfies all constraints
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }

    /// Parse `version` loosely and check it against the range
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if `version` is not a valid loose version.
    pub fn matches_str(&self, version: &str) -> Result<bool, VersionError> {
        Ok(self.matches(&parse_loose(version)?))
    }

    /// Get the constraints
    #[must_use]
    pub fn constraints(&self) -> &[VersionConstraint] {
        &self.constraints
    }

    /// Check if this range has any constraints
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(Self::any());
        }

        // An operator written apart from its version (">= 1.2") is joined back
        let mut tokens: Vec<String> = Vec::new();
        let mut pending_operator: Option<&str> = None;
        for token in s.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '!' | '~')) {
                pending_operator = Some(token);
                continue;
            }
            match pending_operator.take() {
                Some(op) => tokens.push(format!("{op}{token}")),
                None => tokens.push(token.to_string()),
            }
        }

        if pending_operator.is_some() || tokens.is_empty() {
            return Err(VersionError::InvalidConstraint {
                input: s.to_string(),
            });
        }

        let constraints = tokens
            .iter()
            .map(|token| VersionConstraint::parse(token))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { constraints })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            write!(f, "*")
        } else {
            let strs: Vec<_> = self.constraints.iter().map(ToString::to_string).collect();
            write!(f, "{}", strs.join(" "))
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        parse_loose(s).unwrap()
    }

    #[test]
    fn test_loose_padding() {
        assert_eq!(v("8"), Version::new(8, 0, 0));
        assert_eq!(v("8"), v("8.0"));
        assert_eq!(v("7.5"), Version::new(7, 5, 0));
        assert_eq!(v("192"), Version::new(192, 0, 0));
        assert!(v("7") < v("7.5"));
        assert!(v("7.5") < v("8"));
    }

    #[test]
    fn test_loose_prerelease() {
        let version = v("1.0.0-rc1");
        assert_eq!(version.pre.as_str(), "rc1");
        assert!(version < v("1.0.0"));
    }

    #[test]
    fn test_loose_rejects_garbage() {
        assert!(parse_loose("").is_err());
        assert!(parse_loose("1.2.3.4").is_err());
        assert!(parse_loose("gcc").is_err());
        assert!(parse_loose("1..2").is_err());
    }

    #[test]
    fn test_exact_constraint() {
        let range = VersionRange::from_str("==1.2.3").unwrap();
        assert!(range.matches(&v("1.2.3")));
        assert!(!range.matches(&v("1.2.4")));

        let bare = VersionRange::from_str("2.75.0").unwrap();
        assert!(bare.matches(&v("2.75")));
    }

    #[test]
    fn test_whitespace_separated_range() {
        let range = VersionRange::from_str(">=2.12.5 <3").unwrap();
        assert!(!range.matches(&v("2.12.4")));
        assert!(range.matches(&v("2.12.5")));
        assert!(range.matches(&v("2.13")));
        assert!(!range.matches(&v("3")));
        assert_eq!(range.to_string(), ">=2.12.5 <3.0.0");
    }

    #[test]
    fn test_comma_and_detached_operator() {
        let range = VersionRange::from_str(">= 1.0, != 1.5.0, <2").unwrap();
        assert_eq!(range.constraints().len(), 3);
        assert!(range.matches(&v("1.4.9")));
        assert!(!range.matches(&v("1.5.0")));
        assert!(!range.matches(&v("2.0")));
    }

    #[test]
    fn test_compatible_constraint() {
        let range = VersionRange::from_str("~=1.2.3").unwrap();
        assert!(range.matches(&v("1.2.3")));
        assert!(range.matches(&v("1.2.9")));
        assert!(!range.matches(&v("1.3.0")));

        let range = VersionRange::from_str("~=1.2").unwrap();
        assert!(range.matches(&v("1.2.0")));
        assert!(range.matches(&v("1.9")));
        assert!(!range.matches(&v("2.0")));
    }

    #[test]
    fn test_any_version() {
        let range = VersionRange::from_str("*").unwrap();
        assert!(range.is_any());
        assert!(range.matches(&v("0.0.1")));
    }

    #[test]
    fn test_invalid_range() {
        assert!(VersionRange::from_str(">=").is_err());
        assert!(VersionRange::from_str("latest").is_err());
    }
}
