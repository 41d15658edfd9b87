//! Error types for the PostgREST adapters.

use tablesync_core::errors::{StoreError, StoreErrorKind};
use thiserror::Error;

/// Result type alias for PostgREST operations.
pub type Result<T> = std::result::Result<T, PostgrestError>;

/// Errors that can occur talking to a PostgREST endpoint.
#[derive(Debug, Error)]
pub enum PostgrestError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from PostgREST
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request could not be built from the given input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API key missing or not usable as a header
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl PostgrestError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map onto the store failure classes the pipeline reports.
    pub fn store_kind(&self) -> StoreErrorKind {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => StoreErrorKind::Authorization,
                408 | 429 | 502..=504 => StoreErrorKind::Network,
                _ => StoreErrorKind::Query,
            },
            Self::Http(err) if err.is_decode() => StoreErrorKind::Format,
            Self::Http(_) => StoreErrorKind::Network,
            Self::Json(_) => StoreErrorKind::Format,
            Self::InvalidRequest(_) => StoreErrorKind::Query,
            Self::Auth(_) => StoreErrorKind::Authorization,
        }
    }
}

impl From<PostgrestError> for StoreError {
    fn from(err: PostgrestError) -> Self {
        StoreError::new(err.store_kind(), err.to_string())
    }
}
