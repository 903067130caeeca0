//! Build tool and recipe error types
//!
//! Failures reported by the external build tool are carried verbatim in
//! `message`; they are not interpreted.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("recipe error: {message}")]
    RecipeError { message: String },

    #[error("required tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("configure failed: {message}")]
    ConfigureFailed { message: String },

    #[error("compile failed: {message}")]
    CompileFailed { message: String },

    #[error("install failed: {message}")]
    InstallFailed { message: String },

    #[error("source edit failed: '{search}' not found in {file}")]
    SourceEdit { file: String, search: String },

    #[error("failed to run {command}: {message}")]
    CommandFailed { command: String, message: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::RecipeError { .. } => Some("Correct the recipe definition before retrying."),
            Self::ToolNotFound { .. } => {
                Some("Install the build tool or point [tools] in the kiln config at it.")
            }
            Self::SourceEdit { .. } => {
                Some("The recipe's source edit no longer matches this version's sources.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::RecipeError { .. } => "build.recipe_error",
            Self::ToolNotFound { .. } => "build.tool_not_found",
            Self::ConfigureFailed { .. } => "build.configure_failed",
            Self::CompileFailed { .. } => "build.compile_failed",
            Self::InstallFailed { .. } => "build.install_failed",
            Self::SourceEdit { .. } => "build.source_edit",
            Self::CommandFailed { .. } => "build.command_failed",
        };
        Some(code)
    }
}
