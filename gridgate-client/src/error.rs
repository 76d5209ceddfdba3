//! Error types for the request pipeline.

use reqwest::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

/// How a caller should react to a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credentials are gone or rejected; the user must sign in again.
    AuthExpired,

    /// The request itself failed; not interpreted by the pipeline.
    Transport,

    /// Credential storage failed.
    Storage,

    /// The request could not be built (bad URL or configuration).
    Configuration,
}

/// Error type for requests sent through the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The server answered 401 and the credentials could not be renewed,
    /// or the renewed credentials were rejected as well.
    #[error("unauthorized: {body}")]
    Unauthorized { body: String },

    /// The renewal endpoint rejected the refresh token or could not be reached.
    #[error("credential renewal failed: {message}")]
    RenewalFailed { message: String },

    /// The server answered with a non-success status other than 401.
    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Network or protocol failure, including undecodable response bodies.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading or writing credentials failed.
    #[error("credential storage error: {0}")]
    Store(#[from] StoreError),

    /// The request path did not form a valid URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::Unauthorized { .. } | PipelineError::RenewalFailed { .. } => {
                ErrorCategory::AuthExpired
            }
            PipelineError::Status { .. } | PipelineError::Transport(_) => ErrorCategory::Transport,
            PipelineError::Store(_) => ErrorCategory::Storage,
            PipelineError::InvalidUrl(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether the user has to authenticate again.
    pub fn is_auth_expired(&self) -> bool {
        self.category() == ErrorCategory::AuthExpired
    }

    /// The HTTP status behind this error, if there was a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PipelineError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            PipelineError::Status { status, .. } => Some(*status),
            PipelineError::Transport(e) => e.status(),
            _ => None,
        }
    }
}
