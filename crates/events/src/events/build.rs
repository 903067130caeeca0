use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::FailureContext;

/// Build systems kiln can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildSystem {
    Meson,
    CMake,
}

/// Pipeline phases; each moves the pipeline one state forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Validate,
    Source,
    Configure,
    Build,
    Package,
    Export,
}

impl BuildPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Source => "source",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Package => "package",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the extracted sources were changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChange {
    /// A unified diff from the recipe folder
    Patch,
    /// An in-place text replacement
    Edit,
}

impl fmt::Display for SourceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Patch => "patch",
            Self::Edit => "edit",
        })
    }
}

/// Build-specific events for the event system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// Build session started
    SessionStarted {
        session_id: String,
        package: String,
        version: String,
        build_system: BuildSystem,
    },

    /// Build phase started
    PhaseStarted {
        session_id: String,
        package: String,
        phase: BuildPhase,
    },

    /// Build phase completed
    PhaseCompleted {
        session_id: String,
        package: String,
        phase: BuildPhase,
        duration: Duration,
    },

    /// External build command started
    CommandStarted {
        session_id: String,
        package: String,
        command: String,
        working_dir: PathBuf,
    },

    /// External build command finished
    CommandCompleted {
        session_id: String,
        package: String,
        command: String,
        exit_code: Option<i32>,
        duration: Duration,
    },

    /// Captured output from a build command
    StepOutput {
        session_id: String,
        package: String,
        line: String,
        is_stderr: bool,
    },

    /// A patch or source edit was applied to the source tree
    SourceChanged {
        session_id: String,
        package: String,
        change: SourceChange,
        /// Patch file or edited file, relative to its folder
        target: String,
        description: Option<String>,
    },

    /// A packaging step ran
    PackageStep {
        session_id: String,
        package: String,
        step: String,
        detail: String,
    },

    /// Build session completed
    SessionCompleted {
        session_id: String,
        package: String,
        version: String,
        package_dir: PathBuf,
        duration: Duration,
    },

    /// Build session failed
    SessionFailed {
        session_id: String,
        package: String,
        version: String,
        phase: Option<BuildPhase>,
        failure: FailureContext,
    },
}
