//! `sync`, `backup` and `restore`: one pass over the catalog.

use anyhow::Result;
use clap::Args;
use log::{info, warn};
use std::path::Path;

use tablesync_core::sync::{RunMode, RunReport};

use crate::context::ServiceContext;
use crate::RunStatus;

const CONCURRENT_WRITER_WARNING: &str = "Destination tables are emptied before they are refilled. \
Do not run this while other clients write to the destination: rows they write between \
the delete and the insert are lost.";

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Restrict the run to these tables (repeatable); catalog order is kept.
    #[arg(long = "table", short = 't', value_name = "TABLE")]
    pub tables: Vec<String>,
}

pub async fn sync(config_path: &Path, args: &RunArgs) -> Result<RunStatus> {
    let ctx = ServiceContext::load(config_path)?;
    let report = ctx
        .orchestrator(&args.tables)?
        .with_source(ctx.source()?)
        .with_destination(ctx.destination()?)
        .run()
        .await?;
    finish(&ctx, report).await
}

pub async fn backup(config_path: &Path, args: &RunArgs) -> Result<RunStatus> {
    let ctx = ServiceContext::load(config_path)?;
    let report = ctx
        .orchestrator(&args.tables)?
        .with_source(ctx.source()?)
        .backup()
        .await?;
    finish(&ctx, report).await
}

pub async fn restore(config_path: &Path, args: &RunArgs) -> Result<RunStatus> {
    let ctx = ServiceContext::load(config_path)?;
    let report = ctx
        .orchestrator(&args.tables)?
        .with_destination(ctx.destination()?)
        .restore()
        .await?;
    finish(&ctx, report).await
}

/// Persist the report, refresh the seed script after a sync, print the summary.
async fn finish(ctx: &ServiceContext, report: RunReport) -> Result<RunStatus> {
    match ctx.backups.save_report(&report).await {
        Ok(path) => info!("Run report written to {}", path.display()),
        Err(err) => warn!("Could not write run report: {}", err),
    }

    if report.mode == RunMode::Sync {
        let script_path = ctx.config.script_path();
        match ctx.sql_generator().write_to(&ctx.catalog, &script_path).await {
            Ok(bytes) => info!("Seed script ({} bytes) written to {}", bytes, script_path.display()),
            Err(err) => warn!("Could not write seed script: {}", err),
        }
    }

    println!("{}", report.summary());
    if report.mode != RunMode::Backup {
        println!("Note: {}", CONCURRENT_WRITER_WARNING);
    }
    Ok(status_for(&report))
}

/// Skipped tables (no backup to restore) do not fail the run.
fn status_for(report: &RunReport) -> RunStatus {
    if report.failed() == 0 {
        RunStatus::Success
    } else {
        RunStatus::TableFailures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tablesync_core::sync::{BackupStore, Record, Snapshot};
    use tempfile::tempdir;

    fn write_config(dir: &Path, db: &Path, tables: &[&str]) -> PathBuf {
        let config = serde_json::json!({
            "source": { "url": "http://127.0.0.1:9/rest/v1", "apiKey": "k" },
            "destination": { "kind": "sqlite", "path": db },
            "backupDir": dir.join("backups"),
            "tables": tables,
        });
        let path = dir.join("tablesync.json");
        std::fs::write(&path, config.to_string()).expect("write config");
        path
    }

    #[tokio::test]
    async fn restore_without_backups_skips_every_table() {
        let dir = tempdir().expect("tempdir");
        let config = write_config(dir.path(), &dir.path().join("local.db"), &["quizzes"]);

        let status = restore(&config, &RunArgs { tables: Vec::new() })
            .await
            .expect("restore");

        assert_eq!(status, RunStatus::Success);
        assert!(dir.path().join("backups").join("last_run.json").exists());
    }

    #[tokio::test]
    async fn restore_into_missing_table_reports_failure() {
        let dir = tempdir().expect("tempdir");
        let config = write_config(dir.path(), &dir.path().join("local.db"), &["quizzes"]);
        let ctx = ServiceContext::load(&config).expect("context");
        ctx.backups
            .save(&Snapshot::new(
                "quizzes",
                vec![Record::new().with("id", 1_i64)],
            ))
            .await
            .expect("save");

        let status = restore(&config, &RunArgs { tables: Vec::new() })
            .await
            .expect("restore");

        assert_eq!(status, RunStatus::TableFailures);
    }

    #[tokio::test]
    async fn unknown_table_filter_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let config = write_config(dir.path(), &dir.path().join("local.db"), &["quizzes"]);

        let result = backup(
            &config,
            &RunArgs {
                tables: vec!["answers".to_string()],
            },
        )
        .await;

        assert!(result.is_err());
    }
}
