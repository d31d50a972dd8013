use std::sync::Arc;

use thiserror::Error;

/// Errors produced by [`MetricsClient`](crate::MetricsClient).
///
/// `InvalidArgument`, `NoRuntime` and `Configuration` are returned directly
/// from `get`/`post`. Every other variant only ever arrives through a
/// [`Completion`](crate::Completion).
#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No tokio runtime available to issue the request")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    #[error("Response parse error: {0}")]
    ResponseParse(#[source] Arc<serde_json::Error>),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MetricsError {
    /// True when the transport could not reach the server at all
    /// (name resolution failure, connection refused).
    pub fn is_connect(&self) -> bool {
        match self {
            MetricsError::Transport(err) => err.is_connect(),
            _ => false,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MetricsError::InvalidArgument(_))
    }
}

impl From<reqwest::Error> for MetricsError {
    fn from(err: reqwest::Error) -> Self {
        MetricsError::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for MetricsError {
    fn from(err: serde_json::Error) -> Self {
        MetricsError::ResponseParse(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
