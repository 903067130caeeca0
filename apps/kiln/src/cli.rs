//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use kiln_types::ColorChoice;
use std::path::PathBuf;

/// kiln - Build C/C++ packages from declarative recipes
#[derive(Parser)]
#[command(name = "kiln")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build C/C++ packages from declarative recipes")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Recipe, version, settings and options of one invocation
#[derive(Args, Clone)]
pub struct RequestArgs {
    /// Path to the recipe file
    pub recipe: PathBuf,

    /// Package version to build
    #[arg(long = "version", value_name = "VERSION")]
    pub package_version: String,

    /// Setting as key=value (repeatable), e.g. -s compiler.version=13
    #[arg(short = 's', long = "setting", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Option as name=value (repeatable), e.g. -o shared=True
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,

    /// TOML profile with [settings] and [options] tables
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a package from a recipe
    Build {
        #[command(flatten)]
        request: RequestArgs,

        /// Workspace directory for sources, build trees and packages
        #[arg(long, value_name = "DIR")]
        workspace: Option<PathBuf>,

        /// Package folder of a supplied dependency (repeatable)
        #[arg(long = "deps", value_name = "DIR")]
        deps: Vec<PathBuf>,

        /// Number of parallel build jobs (0=auto)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Validate settings and options against a recipe without building
    Validate {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Show recipe identity, versions and options
    Info {
        /// Path to the recipe file
        recipe: PathBuf,
    },
}
