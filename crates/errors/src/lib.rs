#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for kiln
//!
//! Errors are organized by the phase that produces them. Every error is
//! fatal to the current recipe invocation; nothing here is retried
//! internally. All error types implement Clone.

use std::borrow::Cow;

use thiserror::Error;

pub mod acquisition;
pub mod build;
pub mod config;
pub mod configuration;
pub mod network;
pub mod packaging;
pub mod version;

pub use acquisition::AcquisitionError;
pub use build::BuildError;
pub use config::ConfigError;
pub use configuration::ConfigurationError;
pub use network::NetworkError;
pub use packaging::PackagingError;
pub use version::VersionError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("packaging error: {0}")]
    Packaging(#[from] PackagingError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("{phase} phase failed: {source}")]
    PhaseFailed { phase: String, source: Box<Error> },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Attach the pipeline phase in which this error occurred.
    ///
    /// An error that already carries a phase keeps the original one.
    #[must_use]
    pub fn in_phase(self, phase: impl Into<String>) -> Self {
        match self {
            Self::PhaseFailed { .. } => self,
            other => Self::PhaseFailed {
                phase: phase.into(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with any phase wrapper removed
    #[must_use]
    pub fn root(&self) -> &Error {
        match self {
            Self::PhaseFailed { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the phase that failed, if known
    #[must_use]
    pub fn phase(&self) -> Option<&str> {
        match self {
            Self::PhaseFailed { phase, .. } => Some(phase),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<semver::Error> for Error {
    fn from(err: semver::Error) -> Self {
        Self::Version(VersionError::ParseError {
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for kiln operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether the invoking framework may retry the same operation.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::PhaseFailed { phase, source } => {
                Cow::Owned(format!("{phase} phase failed: {}", source.user_message()))
            }
            Error::Io { message, path, .. } => match path {
                Some(path) => Cow::Owned(format!("{message} ({})", path.display())),
                None => Cow::Owned(message.clone()),
            },
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Configuration(err) => err.user_hint(),
            Error::Acquisition(err) => err.user_hint(),
            Error::Build(err) => err.user_hint(),
            Error::Packaging(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Version(err) => err.user_hint(),
            Error::Network(err) => err.user_hint(),
            Error::PhaseFailed { source, .. } => source.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Acquisition(err) => err.is_retryable(),
            Error::Network(err) => err.is_retryable(),
            Error::PhaseFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Configuration(err) => err.user_code(),
            Error::Acquisition(err) => err.user_code(),
            Error::Build(err) => err.user_code(),
            Error::Packaging(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Version(err) => err.user_code(),
            Error::Network(err) => err.user_code(),
            Error::PhaseFailed { source, .. } => source.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
