//! Per-table outcomes and the aggregated run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

use super::catalog::TableSpec;
use crate::errors::{Error, ErrorKind};

/// Pipeline step a table goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Fetch,
    LoadBackup,
    Backup,
    Delete,
    Insert,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::LoadBackup => "load_backup",
            Self::Backup => "backup",
            Self::Delete => "delete",
            Self::Insert => "insert",
        }
    }
}

/// Which orchestrator entry point produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// fetch → backup → replace
    Sync,
    /// fetch → backup
    Backup,
    /// load backup → replace
    Restore,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

/// Result of one full-replace against the destination store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ImportOutcome {
    Replaced {
        table: String,
        deleted: u64,
        inserted: u64,
    },
    /// Delete failed; nothing was inserted.
    DeleteFailed { table: String, message: String },
    /// Rows were removed but the insert failed: the table is left empty.
    InsertFailed {
        table: String,
        deleted: u64,
        message: String,
    },
}

impl ImportOutcome {
    pub fn table(&self) -> &str {
        match self {
            Self::Replaced { table, .. }
            | Self::DeleteFailed { table, .. }
            | Self::InsertFailed { table, .. } => table,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }

    pub fn is_data_loss(&self) -> bool {
        matches!(self, Self::InsertFailed { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Replaced { .. } => None,
            Self::DeleteFailed { .. } => Some(ErrorKind::DeleteError),
            Self::InsertFailed { .. } => Some(ErrorKind::InsertError),
        }
    }
}

/// Final state of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    /// Destination now holds exactly the snapshot rows.
    Replaced,
    /// Snapshot written; destination not touched in this mode.
    BackedUp,
    Failed {
        phase: SyncPhase,
        kind: ErrorKind,
        message: String,
    },
    /// Nothing was attempted for this table.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOutcome {
    pub table: String,
    pub position: usize,
    pub status: TableStatus,
    pub fetched: Option<usize>,
    pub deleted: Option<u64>,
    pub inserted: Option<u64>,
    /// Phases not attempted because an earlier phase failed.
    pub skipped_phases: Vec<SyncPhase>,
    /// The destination table was emptied and not refilled.
    pub data_loss: bool,
    pub duration_ms: i64,
}

impl TableOutcome {
    pub fn new(spec: &TableSpec, status: TableStatus) -> Self {
        Self {
            table: spec.name.clone(),
            position: spec.position,
            status,
            fetched: None,
            deleted: None,
            inserted: None,
            skipped_phases: Vec::new(),
            data_loss: false,
            duration_ms: 0,
        }
    }

    pub fn failed(spec: &TableSpec, phase: SyncPhase, err: &Error, skipped: &[SyncPhase]) -> Self {
        let mut outcome = Self::new(
            spec,
            TableStatus::Failed {
                phase,
                kind: err.kind(),
                message: err.to_string(),
            },
        );
        outcome.skipped_phases = skipped.to_vec();
        outcome
    }

    pub fn skipped(spec: &TableSpec, reason: impl Into<String>, skipped: &[SyncPhase]) -> Self {
        let mut outcome = Self::new(
            spec,
            TableStatus::Skipped {
                reason: reason.into(),
            },
        );
        outcome.skipped_phases = skipped.to_vec();
        outcome
    }

    /// Fold a destination replace result into this outcome.
    pub fn from_import(spec: &TableSpec, import: ImportOutcome) -> Self {
        match import {
            ImportOutcome::Replaced {
                deleted, inserted, ..
            } => {
                let mut outcome = Self::new(spec, TableStatus::Replaced);
                outcome.deleted = Some(deleted);
                outcome.inserted = Some(inserted);
                outcome
            }
            ImportOutcome::DeleteFailed { message, .. } => {
                let mut outcome = Self::new(
                    spec,
                    TableStatus::Failed {
                        phase: SyncPhase::Delete,
                        kind: ErrorKind::DeleteError,
                        message,
                    },
                );
                outcome.skipped_phases = vec![SyncPhase::Insert];
                outcome
            }
            ImportOutcome::InsertFailed {
                deleted, message, ..
            } => {
                let mut outcome = Self::new(
                    spec,
                    TableStatus::Failed {
                        phase: SyncPhase::Insert,
                        kind: ErrorKind::InsertError,
                        message,
                    },
                );
                outcome.deleted = Some(deleted);
                outcome.inserted = Some(0);
                outcome.data_loss = true;
                outcome
            }
        }
    }

    pub fn with_fetched(mut self, rows: usize) -> Self {
        self.fetched = Some(rows);
        self
    }

    pub fn with_duration(mut self, started: std::time::Instant) -> Self {
        self.duration_ms = started.elapsed().as_millis() as i64;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, TableStatus::Replaced | TableStatus::BackedUp)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TableStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, TableStatus::Skipped { .. })
    }
}

/// Ordered outcomes for every catalog entry of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub tables: Vec<TableOutcome>,
}

impl RunReport {
    pub fn start(mode: RunMode) -> Self {
        Self {
            run_id: Uuid::now_v7().to_string(),
            mode,
            started_at: Utc::now(),
            finished_at: None,
            tables: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: TableOutcome) {
        self.tables.push(outcome);
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn succeeded(&self) -> usize {
        self.tables.iter().filter(|t| t.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.tables.iter().filter(|t| t.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.tables.iter().filter(|t| t.is_skipped()).count()
    }

    /// Tables that were emptied and not refilled.
    pub fn data_loss_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.data_loss)
            .map(|t| t.table.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.tables.iter().all(TableOutcome::is_success)
    }

    /// Plain-text summary for operators.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Run {} ({}): {} succeeded, {} failed, {} skipped",
            self.run_id,
            self.mode.as_str(),
            self.succeeded(),
            self.failed(),
            self.skipped()
        );
        let width = self
            .tables
            .iter()
            .map(|t| t.table.len())
            .max()
            .unwrap_or(0);

        for table in &self.tables {
            let (tag, detail) = match &table.status {
                TableStatus::Replaced => (
                    "ok",
                    format!(
                        "deleted {}, inserted {}",
                        table.deleted.unwrap_or(0),
                        table.inserted.unwrap_or(0)
                    ),
                ),
                TableStatus::BackedUp => {
                    let rows = table.fetched.unwrap_or(0);
                    let noun = if rows == 1 { "row" } else { "rows" };
                    ("ok", format!("backed up {} {}", rows, noun))
                }
                TableStatus::Failed {
                    phase,
                    kind,
                    message,
                } => {
                    let tag = if table.data_loss { "DATA LOSS" } else { "FAILED" };
                    let mut detail = format!("{} failed ({}): {}", phase.as_str(), kind, message);
                    if !table.skipped_phases.is_empty() {
                        let skipped = table
                            .skipped_phases
                            .iter()
                            .map(SyncPhase::as_str)
                            .collect::<Vec<_>>()
                            .join(", ");
                        let _ = write!(detail, "; skipped {}", skipped);
                    }
                    (tag, detail)
                }
                TableStatus::Skipped { reason } => ("skipped", reason.clone()),
            };
            let _ = writeln!(
                out,
                "  [{:<9}] {:<width$}  {}",
                tag,
                table.table,
                detail,
                width = width
            );
        }

        let lost = self.data_loss_tables();
        if !lost.is_empty() {
            let _ = writeln!(
                out,
                "WARNING: destination tables left EMPTY after a failed insert: {}. Re-run `restore` for these tables.",
                lost.join(", ")
            );
        }
        out
    }
}
