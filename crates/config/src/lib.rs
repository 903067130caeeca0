#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for kiln
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/kiln/config.toml)
//! - Environment variables
//! - CLI flags (applied by the caller)

use kiln_errors::{ConfigError, Error};
use kiln_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_jobs")]
    pub jobs: usize, // 0 = auto-detect
    /// Generator passed to `cmake -G`; the cmake default when unset
    #[serde(default)]
    pub cmake_generator: Option<String>,
    /// Empty the build folder before each run
    #[serde(default)]
    pub clean_build_dir: bool,
    /// Refuse remote sources whose recipe entry carries no sha256
    #[serde(default)]
    pub require_checksums: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Root of the per-invocation `<name>/<version>/{source,build,package}` folders
    pub workspace: Option<PathBuf>,
}

/// Overrides for external tool binaries; unset entries are looked up on PATH
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    pub meson: Option<PathBuf>,
    pub cmake: Option<PathBuf>,
    pub patch: Option<PathBuf>,
    pub install_name_tool: Option<PathBuf>,
    pub otool: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            cmake_generator: None,
            clean_build_dir: false,
            require_checksums: false,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 300,
            connect_timeout: 30,
            user_agent: default_user_agent(),
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_build_jobs() -> usize {
    0
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("kiln/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("kiln").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // KILN_COLOR
        if let Ok(color) = std::env::var("KILN_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "KILN_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // KILN_BUILD_JOBS
        if let Ok(jobs) = std::env::var("KILN_BUILD_JOBS") {
            self.build.jobs = jobs.parse().map_err(|_| ConfigError::InvalidValue {
                field: "KILN_BUILD_JOBS".to_string(),
                value: jobs,
            })?;
        }

        // KILN_NETWORK_TIMEOUT
        if let Ok(timeout) = std::env::var("KILN_NETWORK_TIMEOUT") {
            self.network.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "KILN_NETWORK_TIMEOUT".to_string(),
                value: timeout,
            })?;
        }

        // KILN_WORKSPACE
        if let Ok(workspace) = std::env::var("KILN_WORKSPACE") {
            if workspace.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "KILN_WORKSPACE".to_string(),
                    value: workspace,
                }
                .into());
            }
            self.paths.workspace = Some(PathBuf::from(workspace));
        }

        Ok(())
    }

    /// Get the workspace path (with default)
    #[must_use]
    pub fn workspace_path(&self) -> PathBuf {
        self.paths.workspace.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("kiln-workspace")
        })
    }

    /// Resolved parallel job count for build tools
    #[must_use]
    pub fn build_jobs(&self) -> usize {
        calculate_build_jobs(self.build.jobs)
    }
}

/// Calculate build jobs based on CPU count
#[must_use]
pub fn calculate_build_jobs(config_value: usize) -> usize {
    if config_value > 0 {
        config_value // User override
    } else {
        // 75% of CPUs, minimum 1
        let cpus = num_cpus::get();
        (cpus * 3 / 4).max(1)
    }
}
