#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for kiln
//!
//! Versions and version ranges, the settings bundle describing the target
//! toolchain, C++ standard levels and option values.

pub mod cppstd;
pub mod option;
pub mod package;
pub mod settings;
pub mod version;

pub use cppstd::{CppStd, StdLevel};
pub use option::OptionValue;
pub use package::{PackageId, Reference};
pub use semver::Version;
pub use settings::{
    Arch, BuildMachine, BuildType, CompilerKind, CompilerSettings, Os, Runtime, Settings,
    SettingsBuilder,
};
pub use version::{parse_loose, VersionConstraint, VersionRange};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Tty,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Tty
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}
