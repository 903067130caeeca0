//! Core types and utilities for build systems

use crate::options::OptionSet;
use crate::BuildEnvironment;
use kiln_errors::Error;
use kiln_types::{OptionValue, Settings};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Build system context containing all necessary information for building
#[derive(Clone, Debug)]
pub struct BuildSystemContext {
    /// Build environment
    pub env: BuildEnvironment,
    /// Source directory
    pub source_dir: PathBuf,
    /// Out-of-source build directory
    pub build_dir: PathBuf,
    /// Installation prefix: the package folder
    pub package_dir: PathBuf,
    /// Toolchain and dependency files
    pub generators_dir: PathBuf,
    /// Number of parallel jobs
    pub jobs: usize,
    /// `-G` generator for cmake
    pub cmake_generator: Option<String>,
    /// `Release`, `Debug`, ... for multi-config generators
    pub build_type: String,
}

impl BuildSystemContext {
    /// Create a new build context
    #[must_use]
    pub fn new(env: BuildEnvironment, source_dir: PathBuf, build_dir: PathBuf) -> Self {
        let generators_dir = build_dir.join("generators");
        Self {
            env,
            package_dir: build_dir.join("package"),
            source_dir,
            build_dir,
            generators_dir,
            jobs: 1,
            cmake_generator: None,
            build_type: "Release".to_string(),
        }
    }

    #[must_use]
    pub fn with_package_dir(mut self, package_dir: PathBuf) -> Self {
        self.package_dir = package_dir;
        self
    }

    #[must_use]
    pub fn with_generators_dir(mut self, generators_dir: PathBuf) -> Self {
        self.generators_dir = generators_dir;
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    #[must_use]
    pub fn with_cmake_generator(mut self, generator: Option<String>) -> Self {
        self.cmake_generator = generator;
        self
    }

    #[must_use]
    pub fn with_build_type(mut self, build_type: impl Into<String>) -> Self {
        self.build_type = build_type.into();
        self
    }

    /// Execute a command in the build context
    ///
    /// # Errors
    ///
    /// Returns an error if command execution fails
    pub async fn execute(
        &self,
        program: &str,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<crate::BuildCommandResult, Error> {
        self.env.execute_command(program, args, working_dir).await
    }
}

/// Everything a toolchain file is rendered from
#[derive(Clone, Debug)]
pub struct ToolchainSpec {
    pub settings: Settings,
    pub options: OptionSet,
    /// Resolved `build.options`
    pub project_options: BTreeMap<String, OptionValue>,
    /// Resolved `build.variables`
    pub variables: BTreeMap<String, OptionValue>,
    pub package_dir: PathBuf,
    /// Folder holding generated dependency files
    pub deps_dir: PathBuf,
}

impl ToolchainSpec {
    #[must_use]
    pub fn shared(&self) -> bool {
        self.options.is_true("shared")
    }

    /// `fPIC` when the option survived pruning
    #[must_use]
    pub fn fpic(&self) -> Option<bool> {
        self.options.get("fPIC").map(OptionValue::is_true)
    }
}

/// Render a path with forward slashes
pub(crate) fn portable_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
