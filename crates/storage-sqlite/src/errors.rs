//! Error types for the SQLite destination.

use tablesync_core::errors::{StoreError, StoreErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Table or column does not match the destination schema.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("Database worker failed: {0}")]
    Worker(String),
}

impl StorageError {
    pub fn store_kind(&self) -> StoreErrorKind {
        match self {
            Self::Pool(_) | Self::Connection(_) | Self::Worker(_) => StoreErrorKind::Network,
            Self::Query(_) | Self::Schema(_) => StoreErrorKind::Query,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        StoreError::new(err.store_kind(), err.to_string())
    }
}
