//! Local importer: full-replace of one destination table.

use log::{debug, error, warn};
use std::sync::Arc;

use super::report_model::ImportOutcome;
use super::snapshot_model::Snapshot;
use super::store::DestinationStore;
use crate::errors::Error;

pub struct LocalImporter {
    destination: Arc<dyn DestinationStore>,
}

impl LocalImporter {
    pub fn new(destination: Arc<dyn DestinationStore>) -> Self {
        Self { destination }
    }

    /// Delete every row of the snapshot's table, then insert the snapshot.
    ///
    /// The insert runs only after a successful delete. An insert failure
    /// leaves the destination table empty and is reported as data loss.
    /// Rows written by another client between the two phases are lost.
    pub async fn replace(&self, snapshot: &Snapshot) -> ImportOutcome {
        let table = snapshot.table();

        let deleted = match self.destination.delete_all(table).await {
            Ok(count) => count,
            Err(err) => {
                let err = Error::delete(table, err);
                warn!("[Importer] {}; insert skipped", err);
                return ImportOutcome::DeleteFailed {
                    table: table.to_string(),
                    message: err.to_string(),
                };
            }
        };
        debug!("[Importer] Deleted {} rows from '{}'", deleted, table);

        if snapshot.is_empty() {
            return ImportOutcome::Replaced {
                table: table.to_string(),
                deleted,
                inserted: 0,
            };
        }

        match self.destination.insert_all(table, snapshot.records()).await {
            Ok(inserted) => {
                debug!("[Importer] Inserted {} rows into '{}'", inserted, table);
                ImportOutcome::Replaced {
                    table: table.to_string(),
                    deleted,
                    inserted,
                }
            }
            Err(err) => {
                let err = Error::insert(table, err);
                error!(
                    "[Importer] {} after deleting {} rows; table is now EMPTY",
                    err, deleted
                );
                ImportOutcome::InsertFailed {
                    table: table.to_string(),
                    deleted,
                    message: err.to_string(),
                }
            }
        }
    }
}
