use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tablesync_core::sync::{
    DestinationStore, FileBackupStore, Orchestrator, SourceStore, SqlGenerator, TableCatalog,
};
use tablesync_core::{DestinationConfig, EndpointConfig, SyncConfig};
use tablesync_postgrest::{PostgrestClient, PostgrestDestination};
use tablesync_storage_sqlite::{create_pool, SqliteDestination};

/// Stores and settings for one CLI invocation, built from the config file.
/// Remote and local connections are only opened by the commands that use them.
pub struct ServiceContext {
    pub config: SyncConfig,
    pub catalog: TableCatalog,
    pub backups: Arc<FileBackupStore>,
}

impl ServiceContext {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = SyncConfig::load(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;
        Self::from_config(config)
    }

    pub fn from_config(config: SyncConfig) -> Result<Self> {
        let catalog = config.catalog()?;
        let backups = Arc::new(FileBackupStore::new(config.backup_dir.clone()));
        debug!(
            "[Context] {} tables, backups in {}",
            catalog.len(),
            backups.dir().display()
        );
        Ok(Self {
            config,
            catalog,
            backups,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    fn postgrest_client(&self, endpoint: &EndpointConfig) -> Result<PostgrestClient> {
        PostgrestClient::new(
            &endpoint.url,
            &endpoint.api_key,
            Some(&endpoint.schema),
            Some(self.timeout()),
        )
        .with_context(|| format!("building client for {}", endpoint.url))
    }

    pub fn source(&self) -> Result<Arc<dyn SourceStore>> {
        Ok(Arc::new(self.postgrest_client(&self.config.source)?))
    }

    pub fn destination(&self) -> Result<Arc<dyn DestinationStore>> {
        match &self.config.destination {
            DestinationConfig::Postgrest {
                endpoint,
                key_column,
            } => Ok(Arc::new(PostgrestDestination::new(
                self.postgrest_client(endpoint)?,
                key_column.clone(),
            ))),
            DestinationConfig::Sqlite { path } => {
                let pool = create_pool(path)
                    .with_context(|| format!("opening {}", path.display()))?;
                Ok(Arc::new(SqliteDestination::new(pool)))
            }
        }
    }

    /// Orchestrator over the named tables (all when empty), with no stores attached.
    pub fn orchestrator(&self, tables: &[String]) -> Result<Orchestrator> {
        let catalog = self.catalog.select(tables)?;
        Ok(Orchestrator::new(catalog, self.backups.clone()))
    }

    pub fn sql_generator(&self) -> SqlGenerator {
        SqlGenerator::new(self.backups.clone()).with_schema(self.config.script_schema.clone())
    }
}
