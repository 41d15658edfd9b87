//! Error types for the table sync pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for sync pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for store adapter calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Classification of a failed store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    /// Credentials were missing, invalid, or lacked permission.
    Authorization,
    /// The store could not be reached or the connection dropped.
    Network,
    /// The store rejected or failed to execute the query.
    Query,
    /// A native value could not be normalized into the tagged value model.
    Format,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Authorization => "authorization",
            Self::Network => "network",
            Self::Query => "query",
            Self::Format => "format",
        };
        f.write_str(label)
    }
}

/// Failure reported by a source or destination store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Authorization, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Network, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Query, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Format, message)
    }
}

/// Stable error classification recorded in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FetchError,
    BackupWriteError,
    BackupReadError,
    BackupNotFound,
    DeleteError,
    InsertError,
    FormatError,
    CatalogError,
    ConfigError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FetchError => "FetchError",
            Self::BackupWriteError => "BackupWriteError",
            Self::BackupReadError => "BackupReadError",
            Self::BackupNotFound => "BackupNotFound",
            Self::DeleteError => "DeleteError",
            Self::InsertError => "InsertError",
            Self::FormatError => "FormatError",
            Self::CatalogError => "CatalogError",
            Self::ConfigError => "ConfigError",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while syncing tables.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a table from the source store failed
    #[error("Failed to fetch table '{table}' ({cause}): {message}")]
    Fetch {
        table: String,
        cause: StoreErrorKind,
        message: String,
    },

    /// Persisting a snapshot failed
    #[error("Failed to write backup for '{table}': {message}")]
    BackupWrite { table: String, message: String },

    /// A backup artifact exists but could not be read or parsed
    #[error("Failed to read backup for '{table}': {message}")]
    BackupRead { table: String, message: String },

    /// No backup artifact was ever written for the table
    #[error("No backup found for table '{0}'")]
    BackupNotFound(String),

    /// Clearing the destination table failed
    #[error("Failed to delete rows from '{table}': {message}")]
    Delete { table: String, message: String },

    /// Inserting the snapshot rows into the destination failed
    #[error("Failed to insert rows into '{table}': {message}")]
    Insert { table: String, message: String },

    /// A value could not be represented in the tagged value model
    #[error("Unsupported value in '{table}': {message}")]
    Format { table: String, message: String },

    /// The table catalog is malformed
    #[error("Invalid table catalog: {0}")]
    Catalog(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build the per-table error for a failed source read.
    pub fn fetch(table: impl Into<String>, err: StoreError) -> Self {
        let table = table.into();
        match err.kind {
            StoreErrorKind::Format => Self::Format {
                table,
                message: err.message,
            },
            cause => Self::Fetch {
                table,
                cause,
                message: err.message,
            },
        }
    }

    pub fn backup_write(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackupWrite {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn backup_read(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackupRead {
            table: table.into(),
            message: message.into(),
        }
    }

    pub fn delete(table: impl Into<String>, err: StoreError) -> Self {
        Self::Delete {
            table: table.into(),
            message: err.to_string(),
        }
    }

    pub fn insert(table: impl Into<String>, err: StoreError) -> Self {
        Self::Insert {
            table: table.into(),
            message: err.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Classification used in run reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. } => ErrorKind::FetchError,
            Self::BackupWrite { .. } => ErrorKind::BackupWriteError,
            Self::BackupRead { .. } | Self::Json(_) => ErrorKind::BackupReadError,
            Self::BackupNotFound(_) => ErrorKind::BackupNotFound,
            Self::Delete { .. } => ErrorKind::DeleteError,
            Self::Insert { .. } => ErrorKind::InsertError,
            Self::Format { .. } => ErrorKind::FormatError,
            Self::Catalog(_) => ErrorKind::CatalogError,
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Io(_) => ErrorKind::BackupWriteError,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BackupNotFound(_))
    }
}
