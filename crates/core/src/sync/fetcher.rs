//! Remote fetcher: one unbounded read per table.

use log::{debug, warn};
use std::sync::Arc;

use super::snapshot_model::Snapshot;
use super::store::SourceStore;
use crate::errors::{Error, Result};

pub struct RemoteFetcher {
    source: Arc<dyn SourceStore>,
}

impl RemoteFetcher {
    pub fn new(source: Arc<dyn SourceStore>) -> Self {
        Self { source }
    }

    /// Read the whole table. No pagination: tables larger than one response
    /// can carry are not supported. A failed read yields no snapshot.
    pub async fn fetch(&self, table: &str) -> Result<Snapshot> {
        debug!("[Fetcher] Fetching all rows of '{}'", table);
        match self.source.fetch_all(table).await {
            Ok(records) => {
                debug!("[Fetcher] '{}' returned {} rows", table, records.len());
                Ok(Snapshot::new(table, records))
            }
            Err(err) => {
                warn!("[Fetcher] Failed to fetch '{}': {}", table, err);
                Err(Error::fetch(table, err))
            }
        }
    }
}
