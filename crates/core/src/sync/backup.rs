//! Filesystem backup store: `<dir>/<table>.json` plus a metadata sidecar.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::catalog::is_valid_identifier;
use super::report_model::RunReport;
use super::snapshot_model::{Snapshot, SnapshotMeta};
use super::store::BackupStore;
use super::value::records_from_json_value;
use crate::errors::{Error, Result};

const ARTIFACT_EXT: &str = "json";
const META_SUFFIX: &str = ".meta.json";
const REPORT_FILE: &str = "last_run.json";

/// Write `bytes` to a temp file beside `path`, then rename over it.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).await?;
    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(err);
    }
    Ok(())
}

/// Backups stored as human-readable JSON arrays, one file per table.
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    dir: PathBuf,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", table, ARTIFACT_EXT))
    }

    fn meta_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}{}", table, META_SUFFIX))
    }

    /// Tables that currently have an artifact, sorted by name.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut tables = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(META_SUFFIX) || name == REPORT_FILE {
                continue;
            }
            if let Some(table) = name.strip_suffix(".json") {
                if is_valid_identifier(table) {
                    tables.push(table.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Persist a run report as `<dir>/last_run.json`.
    pub async fn save_report(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.dir.join(REPORT_FILE);
        let mut bytes = serde_json::to_vec_pretty(report)?;
        bytes.push(b'\n');
        write_atomic(&path, &bytes).await?;
        Ok(path)
    }

    fn check_table(table: &str) -> Result<()> {
        if is_valid_identifier(table) {
            return Ok(());
        }
        Err(Error::catalog(format!(
            "'{}' is not a valid table identifier",
            table
        )))
    }

    async fn captured_at(&self, table: &str, artifact: &Path) -> DateTime<Utc> {
        let meta_path = self.meta_path(table);
        match fs::read(&meta_path).await {
            Ok(bytes) => match serde_json::from_slice::<SnapshotMeta>(&bytes) {
                Ok(meta) if meta.table == table => return meta.captured_at,
                Ok(meta) => warn!(
                    "[Backup] Metadata {} names table '{}', expected '{}'",
                    meta_path.display(),
                    meta.table,
                    table
                ),
                Err(err) => warn!(
                    "[Backup] Ignoring unreadable metadata {}: {}",
                    meta_path.display(),
                    err
                ),
            },
            Err(err) if err.kind() == IoErrorKind::NotFound => {}
            Err(err) => warn!(
                "[Backup] Failed to read metadata {}: {}",
                meta_path.display(),
                err
            ),
        }

        match fs::metadata(artifact).await.and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => DateTime::<Utc>::from(std::time::UNIX_EPOCH),
        }
    }
}

#[async_trait]
impl BackupStore for FileBackupStore {
    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let table = snapshot.table();
        Self::check_table(table)?;

        let mut rows = serde_json::to_vec_pretty(snapshot.records())
            .map_err(|e| Error::backup_write(table, e.to_string()))?;
        rows.push(b'\n');
        let mut meta = serde_json::to_vec_pretty(&SnapshotMeta::from(snapshot))
            .map_err(|e| Error::backup_write(table, e.to_string()))?;
        meta.push(b'\n');

        let artifact = self.artifact_path(table);
        write_atomic(&artifact, &rows)
            .await
            .map_err(|e| Error::backup_write(table, format!("{}: {}", artifact.display(), e)))?;
        let meta_path = self.meta_path(table);
        write_atomic(&meta_path, &meta)
            .await
            .map_err(|e| Error::backup_write(table, format!("{}: {}", meta_path.display(), e)))?;

        debug!(
            "[Backup] Wrote {} rows for '{}' to {}",
            snapshot.len(),
            table,
            artifact.display()
        );
        Ok(())
    }

    async fn load(&self, table: &str) -> Result<Snapshot> {
        Self::check_table(table)?;
        let artifact = self.artifact_path(table);
        let bytes = match fs::read(&artifact).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                return Err(Error::BackupNotFound(table.to_string()));
            }
            Err(err) => {
                return Err(Error::backup_read(
                    table,
                    format!("{}: {}", artifact.display(), err),
                ));
            }
        };

        let value = serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
            Error::backup_read(
                table,
                format!("{} is not valid JSON: {}", artifact.display(), e),
            )
        })?;
        let records = records_from_json_value(value)
            .map_err(|message| Error::backup_read(table, format!("{}: {}", artifact.display(), message)))?;

        let captured_at = self.captured_at(table, &artifact).await;
        Ok(Snapshot::captured(table, captured_at, records))
    }

    async fn exists(&self, table: &str) -> Result<bool> {
        Self::check_table(table)?;
        Ok(fs::try_exists(self.artifact_path(table)).await?)
    }
}
