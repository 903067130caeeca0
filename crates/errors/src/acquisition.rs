//! Source acquisition error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum AcquisitionError {
    #[error("{package} has no source for version {version} (available: {available})")]
    UnknownVersion {
        package: String,
        version: String,
        available: String,
    },

    #[error("download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("{package}: source {url} has no sha256 and checksums are required")]
    MissingChecksum { package: String, url: String },

    #[error("extraction failed: {message}")]
    Extraction { message: String },

    #[error("unsupported archive format: {file}")]
    UnsupportedArchive { file: String },

    #[error("patch {patch} failed: {message}")]
    PatchFailed { patch: String, message: String },

    #[error("patch file not found: {path}")]
    MissingPatch { path: String },
}

impl UserFacingError for AcquisitionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownVersion { .. } => Some("Pick one of the versions listed by the recipe."),
            Self::DownloadFailed { .. } => {
                Some("Check network access to the source host, then retry.")
            }
            Self::ChecksumMismatch { .. } => {
                Some("The archive changed upstream or was corrupted; verify the recipe sha256.")
            }
            Self::MissingChecksum { .. } => {
                Some("Add the archive's sha256 to the recipe, or unset build.require_checksums.")
            }
            Self::PatchFailed { .. } | Self::MissingPatch { .. } => {
                Some("Update the patch so it applies cleanly to this version's sources.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::DownloadFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnknownVersion { .. } => "acquisition.unknown_version",
            Self::DownloadFailed { .. } => "acquisition.download_failed",
            Self::ChecksumMismatch { .. } => "acquisition.checksum_mismatch",
            Self::MissingChecksum { .. } => "acquisition.missing_checksum",
            Self::Extraction { .. } => "acquisition.extraction",
            Self::UnsupportedArchive { .. } => "acquisition.unsupported_archive",
            Self::PatchFailed { .. } => "acquisition.patch_failed",
            Self::MissingPatch { .. } => "acquisition.missing_patch",
        };
        Some(code)
    }
}
