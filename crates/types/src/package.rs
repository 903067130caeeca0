//! Package identity and requirement references

use crate::version::VersionRange;
use kiln_errors::VersionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A concrete package being built: recipe name plus the requested version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub name: String,
    /// Version exactly as listed in the recipe's sources table
    pub version: String,
}

impl PackageId {
    /// Create a new package ID
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// A requirement on another package: `glibmm/2.75.0` or `libxml2/[>=2.12.5 <3]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub range: VersionRange,
}

impl Reference {
    /// Parse a reference string
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidConstraint` if the name is empty or the
    /// bracket is unbalanced, or the version part cannot be parsed.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidConstraint {
            input: s.to_string(),
        };
        let s = s.trim();
        let (name, version) = match s.split_once('/') {
            Some((name, version)) => (name.trim(), version.trim()),
            None => (s, ""),
        };
        if name.is_empty() {
            return Err(invalid());
        }

        let range = if let Some(inner) = version.strip_prefix('[') {
            let inner = inner.strip_suffix(']').ok_or_else(invalid)?;
            inner.parse()?
        } else if version.is_empty() {
            VersionRange::any()
        } else {
            // Anything after '@' or '#' is a user/channel or revision suffix
            let bare = version.split(['@', '#']).next().unwrap_or_default();
            format!("=={bare}").parse()?
        };

        Ok(Self {
            name: name.to_string(),
            range,
        })
    }
}

impl FromStr for Reference {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_any() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/[{}]", self.name, self.range)
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_loose;

    #[test]
    fn test_reference_parse() {
        let reference = Reference::parse("libxml2/[>=2.12.5 <3]").unwrap();
        assert_eq!(reference.name, "libxml2");
        assert!(reference.range.matches(&parse_loose("2.13.1").unwrap()));
        assert!(!reference.range.matches(&parse_loose("3.0").unwrap()));

        let pinned = Reference::parse("glibmm/2.75.0").unwrap();
        assert!(pinned.range.matches(&parse_loose("2.75.0").unwrap()));
        assert!(!pinned.range.matches(&parse_loose("2.76.0").unwrap()));

        let bare = Reference::parse("zlib").unwrap();
        assert!(bare.range.is_any());
    }

    #[test]
    fn test_reference_invalid() {
        assert!(Reference::parse("/1.0").is_err());
        assert!(Reference::parse("meson/[>=1.2.3").is_err());
    }

    #[test]
    fn test_package_id_display() {
        let id = PackageId::new("libxmlpp", "5.5.0");
        assert_eq!(id.to_string(), "libxmlpp/5.5.0");
    }
}
