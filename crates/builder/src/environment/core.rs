//! Core `BuildEnvironment` struct and construction

use kiln_config::ToolsConfig;
use kiln_errors::{BuildError, Error};
use kiln_events::{EventEmitter, EventSender};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment shared by every external command of one build session
#[derive(Clone, Debug)]
pub struct BuildEnvironment {
    /// Session the commands belong to
    pub(crate) session_id: String,
    /// Package being built, as `name/version`
    pub(crate) package: String,
    /// Extra environment variables for child processes
    pub(crate) env_vars: HashMap<String, String>,
    /// Binary overrides from the tool configuration
    pub(crate) tools: ToolsConfig,
    pub(crate) event_sender: Option<EventSender>,
}

impl EventEmitter for BuildEnvironment {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl BuildEnvironment {
    /// Create new build environment
    #[must_use]
    pub fn new(session_id: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            package: package.into(),
            env_vars: HashMap::new(),
            tools: ToolsConfig::default(),
            event_sender: None,
        }
    }

    /// Set binary overrides
    #[must_use]
    pub fn with_tools(mut self, tools: ToolsConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Set event sender
    #[must_use]
    pub fn with_event_sender(mut self, event_sender: Option<EventSender>) -> Self {
        self.event_sender = event_sender;
        self
    }

    /// Add an environment variable for child processes
    #[must_use]
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    fn tool_override(&self, tool: &str) -> Option<&Path> {
        let configured = match tool {
            "meson" => self.tools.meson.as_ref(),
            "cmake" => self.tools.cmake.as_ref(),
            "patch" => self.tools.patch.as_ref(),
            "install_name_tool" => self.tools.install_name_tool.as_ref(),
            "otool" => self.tools.otool.as_ref(),
            _ => None,
        };
        configured.map(PathBuf::as_path)
    }

    /// Locate a tool binary, honoring configured overrides
    ///
    /// # Errors
    ///
    /// Returns `BuildError::ToolNotFound` if the tool is not on `PATH` or
    /// the configured override is not executable.
    pub fn resolve_tool(&self, tool: &str) -> Result<PathBuf, Error> {
        let candidate = self
            .tool_override(tool)
            .map_or_else(|| PathBuf::from(tool), Path::to_path_buf);

        which::which(&candidate).map_err(|_| {
            BuildError::ToolNotFound {
                tool: candidate.display().to_string(),
            }
            .into()
        })
    }
}
