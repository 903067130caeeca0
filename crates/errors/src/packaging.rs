//! Packaging error types
//!
//! A packaging error almost always means the recipe does not match the
//! layout the upstream build installs for this version.

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PackagingError {
    #[error("expected artifact missing: {path}")]
    MissingArtifact { path: String },

    #[error("failed to copy {path}: {message}")]
    CopyFailed { path: String, message: String },

    #[error("invalid pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to fix install name of {path}: {message}")]
    InstallNameFailed { path: String, message: String },

    #[error("failed to write package descriptor {path}: {message}")]
    DescriptorWrite { path: String, message: String },
}

impl UserFacingError for PackagingError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingArtifact { .. } => {
                Some("The installed layout changed; update the recipe's package steps.")
            }
            Self::InvalidPattern { .. } => Some("Fix the glob pattern in the recipe."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingArtifact { .. } => "packaging.missing_artifact",
            Self::CopyFailed { .. } => "packaging.copy_failed",
            Self::InvalidPattern { .. } => "packaging.invalid_pattern",
            Self::InstallNameFailed { .. } => "packaging.install_name_failed",
            Self::DescriptorWrite { .. } => "packaging.descriptor_write",
        };
        Some(code)
    }
}
