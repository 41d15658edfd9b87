//! Per-table pipeline driver.
//!
//! Tables are processed one at a time in catalog order. Every failure is
//! recorded in that table's outcome and the run moves on; nothing is retried.

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Instant;

use super::catalog::{TableCatalog, TableSpec};
use super::fetcher::RemoteFetcher;
use super::importer::LocalImporter;
use super::report_model::{RunMode, RunReport, SyncPhase, TableOutcome, TableStatus};
use super::snapshot_model::Snapshot;
use super::store::{BackupStore, DestinationStore, SourceStore};
use crate::errors::{Error, Result};

pub struct Orchestrator {
    catalog: TableCatalog,
    backups: Arc<dyn BackupStore>,
    fetcher: Option<RemoteFetcher>,
    importer: Option<LocalImporter>,
}

impl Orchestrator {
    pub fn new(catalog: TableCatalog, backups: Arc<dyn BackupStore>) -> Self {
        Self {
            catalog,
            backups,
            fetcher: None,
            importer: None,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn SourceStore>) -> Self {
        self.fetcher = Some(RemoteFetcher::new(source));
        self
    }

    pub fn with_destination(mut self, destination: Arc<dyn DestinationStore>) -> Self {
        self.importer = Some(LocalImporter::new(destination));
        self
    }

    pub fn catalog(&self) -> &TableCatalog {
        &self.catalog
    }

    /// fetch → backup → replace, for every catalog table.
    pub async fn run(&self) -> Result<RunReport> {
        let fetcher = self.require_fetcher()?;
        let importer = self.require_importer()?;
        let mut report = RunReport::start(RunMode::Sync);
        info!(
            "[Orchestrator] Sync run {} over {} tables",
            report.run_id,
            self.catalog.len()
        );

        for spec in self.catalog.iter() {
            let started = Instant::now();
            let outcome = self.sync_table(spec, fetcher, importer).await;
            report.push(outcome.with_duration(started));
        }
        Ok(Self::finish(report))
    }

    /// fetch → backup only; the destination is never touched.
    pub async fn backup(&self) -> Result<RunReport> {
        let fetcher = self.require_fetcher()?;
        let mut report = RunReport::start(RunMode::Backup);
        info!(
            "[Orchestrator] Backup run {} over {} tables",
            report.run_id,
            self.catalog.len()
        );

        for spec in self.catalog.iter() {
            let started = Instant::now();
            let outcome = match self.fetch_and_save(spec, fetcher, &[]).await {
                Ok(snapshot) => {
                    TableOutcome::new(spec, TableStatus::BackedUp).with_fetched(snapshot.len())
                }
                Err(outcome) => *outcome,
            };
            report.push(outcome.with_duration(started));
        }
        Ok(Self::finish(report))
    }

    /// load backup → replace; no source connection needed.
    pub async fn restore(&self) -> Result<RunReport> {
        let importer = self.require_importer()?;
        let mut report = RunReport::start(RunMode::Restore);
        info!(
            "[Orchestrator] Restore run {} over {} tables",
            report.run_id,
            self.catalog.len()
        );

        for spec in self.catalog.iter() {
            let started = Instant::now();
            let outcome = match self.backups.load(&spec.name).await {
                Ok(snapshot) => {
                    let rows = snapshot.len();
                    TableOutcome::from_import(spec, importer.replace(&snapshot).await)
                        .with_fetched(rows)
                }
                Err(Error::BackupNotFound(_)) => {
                    warn!("[Orchestrator] No backup for '{}', skipping", spec.name);
                    TableOutcome::skipped(
                        spec,
                        "no backup artifact",
                        &[SyncPhase::Delete, SyncPhase::Insert],
                    )
                }
                Err(err) => {
                    warn!("[Orchestrator] Cannot load backup for '{}': {}", spec.name, err);
                    TableOutcome::failed(
                        spec,
                        SyncPhase::LoadBackup,
                        &err,
                        &[SyncPhase::Delete, SyncPhase::Insert],
                    )
                }
            };
            report.push(outcome.with_duration(started));
        }
        Ok(Self::finish(report))
    }

    async fn sync_table(
        &self,
        spec: &TableSpec,
        fetcher: &RemoteFetcher,
        importer: &LocalImporter,
    ) -> TableOutcome {
        let snapshot = match self
            .fetch_and_save(spec, fetcher, &[SyncPhase::Delete, SyncPhase::Insert])
            .await
        {
            Ok(snapshot) => snapshot,
            Err(outcome) => return *outcome,
        };
        TableOutcome::from_import(spec, importer.replace(&snapshot).await)
            .with_fetched(snapshot.len())
    }

    /// `downstream` lists the phases that will not run if this step fails.
    async fn fetch_and_save(
        &self,
        spec: &TableSpec,
        fetcher: &RemoteFetcher,
        downstream: &[SyncPhase],
    ) -> std::result::Result<Snapshot, Box<TableOutcome>> {
        let snapshot = match fetcher.fetch(&spec.name).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let mut skipped = vec![SyncPhase::Backup];
                skipped.extend_from_slice(downstream);
                return Err(Box::new(TableOutcome::failed(
                    spec,
                    SyncPhase::Fetch,
                    &err,
                    &skipped,
                )));
            }
        };
        if let Err(err) = self.backups.save(&snapshot).await {
            warn!("[Orchestrator] Backup failed for '{}': {}", spec.name, err);
            return Err(Box::new(
                TableOutcome::failed(spec, SyncPhase::Backup, &err, downstream)
                    .with_fetched(snapshot.len()),
            ));
        }
        Ok(snapshot)
    }

    fn require_fetcher(&self) -> Result<&RemoteFetcher> {
        self.fetcher
            .as_ref()
            .ok_or_else(|| Error::config("no source store configured"))
    }

    fn require_importer(&self) -> Result<&LocalImporter> {
        self.importer
            .as_ref()
            .ok_or_else(|| Error::config("no destination store configured"))
    }

    fn finish(report: RunReport) -> RunReport {
        let report = report.finish();
        info!(
            "[Orchestrator] Run {} finished: {} succeeded, {} failed, {} skipped",
            report.run_id,
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        let lost = report.data_loss_tables();
        if !lost.is_empty() {
            error!(
                "[Orchestrator] Destination tables left empty after failed insert: {}",
                lost.join(", ")
            );
        }
        report
    }
}
