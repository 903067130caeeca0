#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]
//! Package building from recipes for kiln
//!
//! This crate turns a declarative recipe plus a settings bundle into a
//! prefix-installed package folder: it validates the request, fetches and
//! patches sources, renders meson or cmake toolchain files, drives the
//! build, normalizes the installed tree and writes the package descriptor.

mod build_systems;
mod core;
pub mod dependencies;
mod environment;
pub mod export;
pub mod options;
pub mod packaging;
pub mod recipe;
pub mod source;
mod utils;
pub mod validation;

pub use build_systems::{
    build_system_for, BuildSystem, BuildSystemContext, CMakeBuildSystem, MesonBuildSystem,
    ToolchainSpec,
};
pub use core::builder::{BuildReport, Builder, ValidatedRecipe};
pub use core::context::{BuildRequest, BuilderConfig, PackageLayout};
pub use core::pipeline::{Pipeline, PipelineState};
pub use environment::{BuildCommandResult, BuildEnvironment};
pub use export::{PackageInfo, DESCRIPTOR_FILE};
pub use options::{parse_option_pair, OptionSet, OptionSetBuilder};
pub use packaging::{Packager, PackagingSummary};
pub use recipe::model::{BuildSystemKind, PackageStep, Recipe};
pub use recipe::parser::{expand_variables, parse_recipe, parse_recipe_from_str, validate_recipe};
pub use source::{resolve_source, AcquiredSource, SourceAcquirer};
pub use validation::{ValidationReport, Validator};
