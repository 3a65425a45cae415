//! Error types for the pipedeck core

use thiserror::Error;

/// Main error type for the pipedeck core
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid base URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Log stream error: {0}")]
    StreamError(String),

    #[error("Bulk operation error: {0}")]
    BulkStateError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Watcher error: {0}")]
    WatchError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeckError {
    /// Whether this error is the backend saying "no such thing" rather than
    /// a transport or decoding failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            DeckError::NotFound(_) => true,
            DeckError::ApiError { status, .. } => *status == 404,
            _ => false,
        }
    }
}

impl From<anyhow::Error> for DeckError {
    fn from(err: anyhow::Error) -> Self {
        DeckError::Internal(err.to_string())
    }
}
