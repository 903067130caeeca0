//! Transport errors raised while fetching source archives

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("could not reach {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("transfer from {url} broke off: {message}")]
    Transfer { url: String, message: String },

    #[error("{url} answered HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid source URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("HTTP client could not be created: {message}")]
    Client { message: String },
}

impl NetworkError {
    /// URL the failure is about, if any
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Timeout { url }
            | Self::Unreachable { url, .. }
            | Self::Transfer { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::InvalidUrl { url, .. } => Some(url),
            Self::Client { .. } => None,
        }
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::Unreachable { .. } | Self::Transfer { .. } => {
                Some("Check network access to the source host, or add a mirror URL.")
            }
            Self::HttpStatus { status: 404, .. } => {
                Some("The archive moved upstream; update the recipe URL.")
            }
            Self::InvalidUrl { .. } => Some("Fix the source URL in the recipe."),
            _ => None,
        }
    }

    /// Transport failures, 429 and 5xx statuses
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Unreachable { .. } | Self::Transfer { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidUrl { .. } | Self::Client { .. } => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::Unreachable { .. } => "network.unreachable",
            Self::Transfer { .. } => "network.transfer",
            Self::HttpStatus { .. } => "network.http_status",
            Self::InvalidUrl { .. } => "network.invalid_url",
            Self::Client { .. } => "network.client",
        };
        Some(code)
    }
}
