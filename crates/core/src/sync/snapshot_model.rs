//! Immutable per-table snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::Record;

/// Full row set of one table captured at one fetch instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    table: String,
    captured_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl Snapshot {
    /// Snapshot captured now.
    pub fn new(table: impl Into<String>, records: Vec<Record>) -> Self {
        Self::captured(table, Utc::now(), records)
    }

    pub fn captured(
        table: impl Into<String>,
        captured_at: DateTime<Utc>,
        records: Vec<Record>,
    ) -> Self {
        Self {
            table: table.into(),
            captured_at,
            records,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column set of the first record. Later records are assumed to match.
    pub fn columns(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|record| record.columns().collect())
            .unwrap_or_default()
    }
}

/// Sidecar metadata stored next to each backup artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub table: String,
    pub captured_at: DateTime<Utc>,
    pub row_count: usize,
}

impl From<&Snapshot> for SnapshotMeta {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            table: snapshot.table.clone(),
            captured_at: snapshot.captured_at,
            row_count: snapshot.records.len(),
        }
    }
}
