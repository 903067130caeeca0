//! Recipe option values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single option value
///
/// Strings spelling a boolean (`True`, `false`, ...) are normalized to
/// `Bool`, so `"true"` in a profile and `true` in YAML compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged, from = "RawOptionValue")]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<RawOptionValue> for OptionValue {
    fn from(raw: RawOptionValue) -> Self {
        match raw {
            RawOptionValue::Bool(b) => Self::Bool(b),
            RawOptionValue::Int(i) => Self::Str(i.to_string()),
            RawOptionValue::Float(f) => Self::Str(f.to_string()),
            RawOptionValue::Str(s) => Self::parse(&s),
        }
    }
}

impl OptionValue {
    /// Parse a textual option value
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "True" | "true" | "TRUE" => Self::Bool(true),
            "False" | "false" | "FALSE" => Self::Bool(false),
            other => Self::Str(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        self.as_bool().unwrap_or(false)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_booleans() {
        assert_eq!(OptionValue::parse("True"), OptionValue::Bool(true));
        assert_eq!(OptionValue::parse("false"), OptionValue::Bool(false));
        assert_eq!(
            OptionValue::parse("static"),
            OptionValue::Str("static".into())
        );
    }

    #[test]
    fn test_deserialize_normalizes() {
        let values: Vec<OptionValue> = serde_json::from_str(r#"[true, "False", "shared", 3]"#).unwrap();
        assert_eq!(
            values,
            vec![
                OptionValue::Bool(true),
                OptionValue::Bool(false),
                OptionValue::Str("shared".into()),
                OptionValue::Str("3".into()),
            ]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(OptionValue::Bool(true).to_string(), "True");
        assert_eq!(OptionValue::Str("x".into()).to_string(), "x");
    }
}
