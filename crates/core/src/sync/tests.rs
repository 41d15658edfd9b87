//! Pipeline tests against in-memory stores.

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

use super::*;
use crate::errors::{Error, ErrorKind, Result, StoreError, StoreResult};

#[derive(Default)]
struct FakeSource {
    tables: HashMap<String, StoreResult<Vec<Record>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    fn with_table(mut self, table: &str, rows: Vec<Record>) -> Self {
        self.tables.insert(table.to_string(), Ok(rows));
        self
    }

    fn with_failure(mut self, table: &str, err: StoreError) -> Self {
        self.tables.insert(table.to_string(), Err(err));
        self
    }
}

#[async_trait]
impl SourceStore for FakeSource {
    async fn fetch_all(&self, table: &str) -> StoreResult<Vec<Record>> {
        self.calls.lock().unwrap().push(table.to_string());
        self.tables
            .get(table)
            .cloned()
            .unwrap_or_else(|| Err(StoreError::query(format!("relation \"{}\" does not exist", table))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DestCall {
    Delete(String),
    Insert(String, usize),
}

#[derive(Default)]
struct FakeDestination {
    rows: Mutex<HashMap<String, Vec<Record>>>,
    fail_delete: HashSet<String>,
    fail_insert: HashSet<String>,
    calls: Mutex<Vec<DestCall>>,
}

impl FakeDestination {
    fn seeded(table: &str, rows: Vec<Record>) -> Self {
        let dest = Self::default();
        dest.rows.lock().unwrap().insert(table.to_string(), rows);
        dest
    }

    fn failing_delete(mut self, table: &str) -> Self {
        self.fail_delete.insert(table.to_string());
        self
    }

    fn failing_insert(mut self, table: &str) -> Self {
        self.fail_insert.insert(table.to_string());
        self
    }

    fn rows(&self, table: &str) -> Vec<Record> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn calls(&self) -> Vec<DestCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationStore for FakeDestination {
    async fn delete_all(&self, table: &str) -> StoreResult<u64> {
        self.calls
            .lock()
            .unwrap()
            .push(DestCall::Delete(table.to_string()));
        if self.fail_delete.contains(table) {
            return Err(StoreError::authorization("permission denied for table"));
        }
        let removed = self.rows.lock().unwrap().remove(table).unwrap_or_default();
        Ok(removed.len() as u64)
    }

    async fn insert_all(&self, table: &str, records: &[Record]) -> StoreResult<u64> {
        self.calls
            .lock()
            .unwrap()
            .push(DestCall::Insert(table.to_string(), records.len()));
        if self.fail_insert.contains(table) {
            return Err(StoreError::query("insert or update violates foreign key constraint"));
        }
        self.rows
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(records.iter().cloned());
        Ok(records.len() as u64)
    }
}

/// File store that refuses to write the listed tables.
struct FailingBackups {
    inner: FileBackupStore,
    fail_save: HashSet<String>,
}

#[async_trait]
impl BackupStore for FailingBackups {
    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_save.contains(snapshot.table()) {
            return Err(Error::backup_write(snapshot.table(), "No space left on device"));
        }
        self.inner.save(snapshot).await
    }

    async fn load(&self, table: &str) -> Result<Snapshot> {
        self.inner.load(table).await
    }

    async fn exists(&self, table: &str) -> Result<bool> {
        self.inner.exists(table).await
    }
}

fn numbered_rows(ids: &[i64]) -> Vec<Record> {
    ids.iter()
        .map(|id| Record::new().with("id", *id).with("label", format!("row {}", id)))
        .collect()
}

fn quiz_type_rows() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", 1_i64)
            .with("name", "Multiple choice")
            .with("config", json!({"options": 4, "hint": "don't guess", "tags": ["a", "b"]})),
        Record::new()
            .with("id", 2_i64)
            .with("name", "True/false")
            .with("config", Value::Null),
    ]
}

#[tokio::test]
async fn delete_failure_skips_insert_and_later_tables_still_run() {
    let dir = tempdir().expect("tempdir");
    let source = Arc::new(
        FakeSource::default()
            .with_table("quizzes", numbered_rows(&[1, 2]))
            .with_table("questions", numbered_rows(&[7])),
    );
    let destination = Arc::new(FakeDestination::default().failing_delete("quizzes"));
    let catalog = TableCatalog::new(["quizzes", "questions"]).expect("catalog");

    let report = Orchestrator::new(catalog, Arc::new(FileBackupStore::new(dir.path())))
        .with_source(source)
        .with_destination(destination.clone())
        .run()
        .await
        .expect("run");

    assert_eq!(
        destination.calls(),
        vec![
            DestCall::Delete("quizzes".to_string()),
            DestCall::Delete("questions".to_string()),
            DestCall::Insert("questions".to_string(), 1),
        ]
    );
    let quizzes = report.outcome("quizzes").expect("quizzes outcome");
    assert!(matches!(
        quizzes.status,
        TableStatus::Failed {
            phase: SyncPhase::Delete,
            kind: ErrorKind::DeleteError,
            ..
        }
    ));
    match &quizzes.status {
        TableStatus::Failed { message, .. } => {
            assert!(
                message.starts_with("Failed to delete rows from 'quizzes': "),
                "{}",
                message
            );
            assert!(message.contains("permission denied"), "{}", message);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(quizzes.skipped_phases, vec![SyncPhase::Insert]);
    assert!(!quizzes.data_loss);
    assert_eq!(
        report.outcome("questions").map(|o| &o.status),
        Some(&TableStatus::Replaced)
    );
}

#[tokio::test]
async fn replace_leaves_exactly_the_snapshot_rows() {
    let destination = Arc::new(FakeDestination::seeded(
        "answers",
        numbered_rows(&[1, 2, 3, 4, 5]),
    ));
    let importer = LocalImporter::new(destination.clone());
    let snapshot = Snapshot::new("answers", numbered_rows(&[10, 11, 12]));

    let outcome = importer.replace(&snapshot).await;

    assert_eq!(
        outcome,
        ImportOutcome::Replaced {
            table: "answers".to_string(),
            deleted: 5,
            inserted: 3,
        }
    );
    assert_eq!(destination.rows("answers"), numbered_rows(&[10, 11, 12]));
}

#[tokio::test]
async fn insert_failure_is_reported_as_data_loss() {
    let dir = tempdir().expect("tempdir");
    let source = Arc::new(FakeSource::default().with_table("scores", numbered_rows(&[1])));
    let destination = Arc::new(
        FakeDestination::seeded("scores", numbered_rows(&[1, 2])).failing_insert("scores"),
    );
    let catalog = TableCatalog::new(["scores"]).expect("catalog");

    let report = Orchestrator::new(catalog, Arc::new(FileBackupStore::new(dir.path())))
        .with_source(source)
        .with_destination(destination.clone())
        .run()
        .await
        .expect("run");

    let scores = report.outcome("scores").expect("scores outcome");
    assert!(scores.data_loss);
    assert_eq!(scores.deleted, Some(2));
    match &scores.status {
        TableStatus::Failed { kind, message, .. } => {
            assert_eq!(*kind, ErrorKind::InsertError);
            assert!(
                message.starts_with("Failed to insert rows into 'scores': "),
                "{}",
                message
            );
            assert!(message.contains("foreign key"), "{}", message);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert!(destination.rows("scores").is_empty());
    assert_eq!(report.data_loss_tables(), vec!["scores"]);
    assert!(!report.is_success());
}

#[tokio::test]
async fn backup_failure_keeps_destination_untouched_for_that_table_only() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FailingBackups {
        inner: FileBackupStore::new(dir.path()),
        fail_save: HashSet::from(["quiz_types".to_string()]),
    });
    let source = Arc::new(
        FakeSource::default()
            .with_table("quiz_types", numbered_rows(&[1, 2, 3]))
            .with_table("quizzes", numbered_rows(&[4])),
    );
    let destination = Arc::new(FakeDestination::seeded("quiz_types", numbered_rows(&[9])));
    let catalog = TableCatalog::new(["quiz_types", "quizzes"]).expect("catalog");

    let report = Orchestrator::new(catalog, backups.clone())
        .with_source(source)
        .with_destination(destination.clone())
        .run()
        .await
        .expect("run");

    let failed = report.outcome("quiz_types").expect("quiz_types outcome");
    assert!(matches!(
        failed.status,
        TableStatus::Failed {
            phase: SyncPhase::Backup,
            kind: ErrorKind::BackupWriteError,
            ..
        }
    ));
    assert_eq!(failed.fetched, Some(3));
    assert_eq!(
        failed.skipped_phases,
        vec![SyncPhase::Delete, SyncPhase::Insert]
    );
    assert!(!failed.data_loss);
    assert_eq!(
        destination.calls(),
        vec![
            DestCall::Delete("quizzes".to_string()),
            DestCall::Insert("quizzes".to_string(), 1),
        ]
    );
    assert_eq!(destination.rows("quiz_types"), numbered_rows(&[9]));
    assert!(!backups.exists("quiz_types").await.expect("exists"));
    assert_eq!(
        report.outcome("quizzes").map(|o| &o.status),
        Some(&TableStatus::Replaced)
    );
    assert!(!report.is_success());
}

#[tokio::test]
async fn fetch_failure_prevents_backup_and_import_for_that_table_only() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FileBackupStore::new(dir.path()));
    let source = Arc::new(
        FakeSource::default()
            .with_failure("quiz_types", StoreError::network("connection reset"))
            .with_table("quizzes", numbered_rows(&[3])),
    );
    let destination = Arc::new(FakeDestination::seeded("quiz_types", numbered_rows(&[9])));
    let catalog = TableCatalog::new(["quiz_types", "quizzes"]).expect("catalog");

    let report = Orchestrator::new(catalog, backups.clone())
        .with_source(source.clone())
        .with_destination(destination.clone())
        .run()
        .await
        .expect("run");

    assert_eq!(
        report.tables.iter().map(|t| t.table.as_str()).collect::<Vec<_>>(),
        vec!["quiz_types", "quizzes"]
    );
    let failed = &report.tables[0];
    assert!(matches!(
        failed.status,
        TableStatus::Failed {
            phase: SyncPhase::Fetch,
            kind: ErrorKind::FetchError,
            ..
        }
    ));
    assert_eq!(
        failed.skipped_phases,
        vec![SyncPhase::Backup, SyncPhase::Delete, SyncPhase::Insert]
    );
    assert!(!backups.exists("quiz_types").await.expect("exists"));
    assert_eq!(destination.rows("quiz_types"), numbered_rows(&[9]));
    assert!(!destination
        .calls()
        .contains(&DestCall::Delete("quiz_types".to_string())));
    assert_eq!(report.tables[1].status, TableStatus::Replaced);
    assert_eq!(*source.calls.lock().unwrap(), vec!["quiz_types", "quizzes"]);
}

#[tokio::test]
async fn quiz_types_flow_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FileBackupStore::new(dir.path()));
    let source = Arc::new(FakeSource::default().with_table("quiz_types", quiz_type_rows()));
    let destination = Arc::new(FakeDestination::default());
    let catalog = TableCatalog::new(["quiz_types"]).expect("catalog");

    let snapshot = RemoteFetcher::new(source.clone())
        .fetch("quiz_types")
        .await
        .expect("fetch");
    assert_eq!(snapshot.len(), 2);

    let report = Orchestrator::new(catalog.clone(), backups.clone())
        .with_source(source)
        .with_destination(destination.clone())
        .run()
        .await
        .expect("run");
    assert!(report.is_success());
    assert_eq!(destination.rows("quiz_types"), quiz_type_rows());

    let raw = std::fs::read_to_string(backups.artifact_path("quiz_types")).expect("artifact");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));

    let script = SqlGenerator::new(backups).generate(&catalog).await;
    let inserts = script
        .lines()
        .filter(|line| line.starts_with("INSERT INTO \"public\".\"quiz_types\""))
        .collect::<Vec<_>>();
    assert_eq!(inserts.len(), 2);
    assert_eq!(
        inserts[0],
        r#"INSERT INTO "public"."quiz_types" ("id", "name", "config") VALUES (1, 'Multiple choice', '{"options":4,"hint":"don''t guess","tags":["a","b"]}'::jsonb);"#
    );
    assert_eq!(
        inserts[1],
        r#"INSERT INTO "public"."quiz_types" ("id", "name", "config") VALUES (2, 'True/false', NULL);"#
    );
}

#[tokio::test]
async fn empty_table_gets_empty_artifact_and_comment_only_section() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FileBackupStore::new(dir.path()));
    let source = Arc::new(FakeSource::default().with_table("leaderboards", Vec::new()));
    let destination = Arc::new(FakeDestination::seeded("leaderboards", numbered_rows(&[1])));
    let catalog = TableCatalog::new(["leaderboards"]).expect("catalog");

    let report = Orchestrator::new(catalog.clone(), backups.clone())
        .with_source(source)
        .with_destination(destination.clone())
        .run()
        .await
        .expect("run");

    assert!(report.is_success());
    assert!(destination.rows("leaderboards").is_empty());
    assert!(!destination
        .calls()
        .iter()
        .any(|call| matches!(call, DestCall::Insert(..))));

    let raw = std::fs::read_to_string(backups.artifact_path("leaderboards")).expect("artifact");
    assert_eq!(raw.trim(), "[]");

    let script = SqlGenerator::new(backups).generate(&catalog).await;
    assert_eq!(script, "-- leaderboards: 0 rows\n\n");
}

#[tokio::test]
async fn generation_is_byte_identical_for_unchanged_backups() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FileBackupStore::new(dir.path()));
    backups
        .save(&Snapshot::new("quiz_types", quiz_type_rows()))
        .await
        .expect("save");
    backups
        .save(&Snapshot::new("quizzes", numbered_rows(&[4, 5])))
        .await
        .expect("save");
    let catalog = TableCatalog::new(["quiz_types", "quizzes", "questions"]).expect("catalog");
    let generator = SqlGenerator::new(backups);

    let first = generator.generate(&catalog).await;
    let second = generator.generate(&catalog).await;
    assert_eq!(first.as_bytes(), second.as_bytes());

    let out = dir.path().join("seed.sql");
    let written = generator.write_to(&catalog, &out).await.expect("write");
    assert_eq!(written, first.len());
    assert_eq!(std::fs::read_to_string(out).expect("read"), first);
}

#[tokio::test]
async fn restore_uses_backups_without_a_source() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FileBackupStore::new(dir.path()));
    backups
        .save(&Snapshot::new("quizzes", numbered_rows(&[1, 2])))
        .await
        .expect("save");
    std::fs::write(backups.artifact_path("questions"), b"{}").expect("write broken");
    let destination = Arc::new(FakeDestination::seeded("quizzes", numbered_rows(&[8])));
    let catalog = TableCatalog::new(["quiz_types", "quizzes", "questions"]).expect("catalog");

    let orchestrator = Orchestrator::new(catalog, backups).with_destination(destination.clone());
    assert!(orchestrator.run().await.is_err(), "sync needs a source store");
    let report = orchestrator.restore().await.expect("restore");

    assert!(report.tables[0].is_skipped());
    assert_eq!(report.tables[1].status, TableStatus::Replaced);
    assert_eq!(destination.rows("quizzes"), numbered_rows(&[1, 2]));
    assert!(matches!(
        report.tables[2].status,
        TableStatus::Failed {
            phase: SyncPhase::LoadBackup,
            kind: ErrorKind::BackupReadError,
            ..
        }
    ));
    assert!(!destination
        .calls()
        .contains(&DestCall::Delete("questions".to_string())));
}

#[tokio::test]
async fn backup_mode_never_touches_destination() {
    let dir = tempdir().expect("tempdir");
    let backups = Arc::new(FileBackupStore::new(dir.path()));
    let source = Arc::new(
        FakeSource::default()
            .with_table("quizzes", numbered_rows(&[1]))
            .with_failure("questions", StoreError::authorization("invalid api key")),
    );
    let catalog = TableCatalog::new(["quizzes", "questions"]).expect("catalog");

    let report = Orchestrator::new(catalog, backups.clone())
        .with_source(source)
        .backup()
        .await
        .expect("backup");

    assert_eq!(report.mode, RunMode::Backup);
    assert_eq!(report.tables[0].status, TableStatus::BackedUp);
    assert_eq!(report.tables[0].fetched, Some(1));
    assert_eq!(report.tables[1].skipped_phases, vec![SyncPhase::Backup]);
    assert_eq!(
        backups.load("quizzes").await.expect("load").records(),
        numbered_rows(&[1]).as_slice()
    );
}
