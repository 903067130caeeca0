//! Configuration (settings/options) error types
//!
//! These are raised before any source acquisition happens. The user has
//! to change settings or options to get past them.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("{package}: cross-building is not supported")]
    CrossBuildingUnsupported { package: String },

    #[error("{package} requires at least C++{required}, but compiler.cppstd is {actual}")]
    CppStdTooLow {
        package: String,
        required: String,
        actual: String,
    },

    #[error(
        "{package} requires C++{standard}, which {compiler} {version} does not support (minimum {minimum})"
    )]
    CompilerTooOld {
        package: String,
        standard: String,
        compiler: String,
        version: String,
        minimum: String,
    },

    #[error("{package}: {reason}")]
    InvalidCombination { package: String, reason: String },

    #[error("unknown option: {name}")]
    UnknownOption { name: String },

    #[error("invalid value '{value}' for option {name} (allowed: {allowed})")]
    InvalidOptionValue {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("invalid setting {key}={value}")]
    InvalidSetting { key: String, value: String },

    #[error("missing required setting: {key}")]
    MissingSetting { key: String },
}

impl UserFacingError for ConfigurationError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CrossBuildingUnsupported { .. } => {
                Some("Build on the target platform instead of cross-building.")
            }
            Self::CppStdTooLow { .. } => Some("Raise compiler.cppstd in your settings."),
            Self::CompilerTooOld { .. } => {
                Some("Use a newer compiler or an older recipe version with a lower C++ standard.")
            }
            Self::InvalidCombination { .. } => {
                Some("Change the option or toolchain combination named in the message.")
            }
            Self::UnknownOption { .. } | Self::InvalidOptionValue { .. } => {
                Some("Run `kiln info <recipe>` to list the options the recipe declares.")
            }
            Self::InvalidSetting { .. } | Self::MissingSetting { .. } => {
                Some("Pass settings as key=value pairs, e.g. -s compiler.version=13.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::CrossBuildingUnsupported { .. } => "configuration.cross_building",
            Self::CppStdTooLow { .. } => "configuration.cppstd_too_low",
            Self::CompilerTooOld { .. } => "configuration.compiler_too_old",
            Self::InvalidCombination { .. } => "configuration.invalid_combination",
            Self::UnknownOption { .. } => "configuration.unknown_option",
            Self::InvalidOptionValue { .. } => "configuration.invalid_option_value",
            Self::InvalidSetting { .. } => "configuration.invalid_setting",
            Self::MissingSetting { .. } => "configuration.missing_setting",
        };
        Some(code)
    }
}
