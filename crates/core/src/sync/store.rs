//! Store adapter contracts.
//!
//! Adapters normalize native values into [`Record`]s at this boundary; the
//! pipeline never inspects store-native types.

use async_trait::async_trait;

use super::snapshot_model::Snapshot;
use super::value::Record;
use crate::errors::{Result, StoreResult};

/// Read-only access to the source record store.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Every row of `table` in one read.
    async fn fetch_all(&self, table: &str) -> StoreResult<Vec<Record>>;
}

/// Destructive access to the destination record store.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Remove every row of `table`; returns the number of rows removed.
    async fn delete_all(&self, table: &str) -> StoreResult<u64>;

    /// Insert all `records` into `table`; returns the number of rows inserted.
    async fn insert_all(&self, table: &str, records: &[Record]) -> StoreResult<u64>;
}

/// Durable snapshot storage, one artifact per table.
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Overwrite the table's artifact. Empty snapshots are stored explicitly.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Fails with `Error::BackupNotFound` when nothing was ever saved.
    async fn load(&self, table: &str) -> Result<Snapshot>;

    async fn exists(&self, table: &str) -> Result<bool>;
}
