//! Errors raised by the ARM transport

use thiserror::Error;

/// A failed call against Azure Resource Manager
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("API request failed with status {status} ({}): {message}", .code.as_deref().unwrap_or("-"))]
    Status {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("long-running operation ended in state {status:?}: {message}")]
    OperationFailed {
        status: String,
        code: Option<String>,
        message: String,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid polling URL {url:?}: {reason}")]
    InvalidPollingUrl { url: String, reason: String },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// True when the remote side answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// HTTP status of the failed call, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
