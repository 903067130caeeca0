//! C++ language standard levels

use kiln_errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A C++ standard revision, ordered chronologically (98 < 11 < ... < 26)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StdLevel {
    #[serde(rename = "98")]
    Cxx98,
    #[serde(rename = "11")]
    Cxx11,
    #[serde(rename = "14")]
    Cxx14,
    #[serde(rename = "17")]
    Cxx17,
    #[serde(rename = "20")]
    Cxx20,
    #[serde(rename = "23")]
    Cxx23,
    #[serde(rename = "26")]
    Cxx26,
}

impl StdLevel {
    /// The two-digit revision number
    #[must_use]
    pub fn number(self) -> &'static str {
        match self {
            Self::Cxx98 => "98",
            Self::Cxx11 => "11",
            Self::Cxx14 => "14",
            Self::Cxx17 => "17",
            Self::Cxx20 => "20",
            Self::Cxx23 => "23",
            Self::Cxx26 => "26",
        }
    }
}

impl fmt::Display for StdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.number())
    }
}

impl FromStr for StdLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = s.trim().trim_start_matches("c++");
        match number {
            "98" | "03" => Ok(Self::Cxx98),
            "11" | "0x" => Ok(Self::Cxx11),
            "14" | "1y" => Ok(Self::Cxx14),
            "17" | "1z" => Ok(Self::Cxx17),
            "20" | "2a" => Ok(Self::Cxx20),
            "23" | "2b" => Ok(Self::Cxx23),
            "26" | "2c" => Ok(Self::Cxx26),
            _ => Err(ConfigurationError::InvalidSetting {
                key: "compiler.cppstd".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// The `compiler.cppstd` setting: a level plus the GNU extensions flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CppStd {
    pub level: StdLevel,
    pub gnu_extensions: bool,
}

impl CppStd {
    #[must_use]
    pub fn new(level: StdLevel) -> Self {
        Self {
            level,
            gnu_extensions: false,
        }
    }

    #[must_use]
    pub fn gnu(level: StdLevel) -> Self {
        Self {
            level,
            gnu_extensions: true,
        }
    }

    /// Value for meson's `cpp_std` built-in option
    #[must_use]
    pub fn meson_value(self) -> String {
        if self.gnu_extensions {
            format!("gnu++{}", self.level)
        } else {
            format!("c++{}", self.level)
        }
    }

    /// Value for `CMAKE_CXX_STANDARD`
    #[must_use]
    pub fn cmake_value(self) -> &'static str {
        self.level.number()
    }
}

impl fmt::Display for CppStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gnu_extensions {
            write!(f, "gnu{}", self.level)
        } else {
            write!(f, "{}", self.level)
        }
    }
}

impl FromStr for CppStd {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(rest) = trimmed.strip_prefix("gnu") {
            let level = rest.trim_start_matches("++").parse().map_err(|_| {
                ConfigurationError::InvalidSetting {
                    key: "compiler.cppstd".to_string(),
                    value: s.to_string(),
                }
            })?;
            Ok(Self::gnu(level))
        } else {
            Ok(Self::new(trimmed.parse()?))
        }
    }
}

impl Serialize for CppStd {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CppStd {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_chronological() {
        assert!(StdLevel::Cxx98 < StdLevel::Cxx11);
        assert!(StdLevel::Cxx11 < StdLevel::Cxx14);
        assert!(StdLevel::Cxx17 < StdLevel::Cxx20);
        assert!(StdLevel::Cxx23 < StdLevel::Cxx26);
    }

    #[test]
    fn test_parse_gnu_variant() {
        let std: CppStd = "gnu17".parse().unwrap();
        assert_eq!(std.level, StdLevel::Cxx17);
        assert!(std.gnu_extensions);
        assert_eq!(std.to_string(), "gnu17");
        assert_eq!(std.meson_value(), "gnu++17");
        assert_eq!(std.cmake_value(), "17");
    }

    #[test]
    fn test_parse_plain_variant() {
        let std: CppStd = "14".parse().unwrap();
        assert_eq!(std, CppStd::new(StdLevel::Cxx14));
        assert_eq!(std.meson_value(), "c++14");

        assert_eq!("c++20".parse::<StdLevel>().unwrap(), StdLevel::Cxx20);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("15".parse::<CppStd>().is_err());
        assert!("gnu".parse::<CppStd>().is_err());
    }
}
