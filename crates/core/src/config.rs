//! Run configuration loaded from a JSON file, with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::sync::{TableCatalog, DEFAULT_SCHEMA};

pub const SOURCE_URL_ENV: &str = "TABLESYNC_SOURCE_URL";
pub const SOURCE_KEY_ENV: &str = "TABLESYNC_SOURCE_KEY";
pub const DEST_URL_ENV: &str = "TABLESYNC_DEST_URL";
pub const DEST_KEY_ENV: &str = "TABLESYNC_DEST_KEY";

const DEFAULT_BACKUP_DIR: &str = "backups";
const DEFAULT_SCRIPT_FILE: &str = "seed.sql";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const REDACTED: &str = "***";

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_DIR)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_script_schema() -> Option<String> {
    Some(default_schema())
}

/// A PostgREST endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DestinationConfig {
    #[serde(rename_all = "camelCase")]
    Postgrest {
        #[serde(flatten)]
        endpoint: EndpointConfig,
        /// Column used for the match-all delete filter.
        #[serde(default = "default_key_column")]
        key_column: String,
    },
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    pub source: EndpointConfig,
    pub destination: DestinationConfig,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    #[serde(default = "default_script_schema")]
    pub script_schema: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    pub tables: Vec<String>,
}

impl SyncConfig {
    /// Read, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overrides are trimmed; URLs also lose a trailing `/`. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = |key: &str| {
            lookup(key)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
        };
        let secret = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = url(SOURCE_URL_ENV) {
            self.source.url = v;
        }
        if let Some(v) = secret(SOURCE_KEY_ENV) {
            self.source.api_key = v;
        }
        if let DestinationConfig::Postgrest { endpoint, .. } = &mut self.destination {
            if let Some(v) = url(DEST_URL_ENV) {
                endpoint.url = v;
            }
            if let Some(v) = secret(DEST_KEY_ENV) {
                endpoint.api_key = v;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_endpoint("source", &self.source)?;
        match &self.destination {
            DestinationConfig::Postgrest {
                endpoint,
                key_column,
            } => {
                validate_endpoint("destination", endpoint)?;
                if key_column.trim().is_empty() {
                    return Err(Error::config("destination.keyColumn is empty"));
                }
            }
            DestinationConfig::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(Error::config("destination.path is empty"));
                }
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::config("requestTimeoutSecs must be positive"));
        }
        self.catalog()
            .map(|_| ())
            .map_err(|e| Error::config(e.to_string()))
    }

    pub fn catalog(&self) -> Result<TableCatalog> {
        TableCatalog::new(self.tables.iter().map(String::as_str))
    }

    pub fn script_path(&self) -> PathBuf {
        self.script_path
            .clone()
            .unwrap_or_else(|| self.backup_dir.join(DEFAULT_SCRIPT_FILE))
    }

    /// Copy with API keys masked, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.source.api_key = REDACTED.to_string();
        if let DestinationConfig::Postgrest { endpoint, .. } = &mut copy.destination {
            endpoint.api_key = REDACTED.to_string();
        }
        copy
    }
}

fn validate_endpoint(label: &str, endpoint: &EndpointConfig) -> Result<()> {
    if endpoint.url.trim().is_empty() {
        return Err(Error::config(format!("{}.url is empty", label)));
    }
    if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
        return Err(Error::config(format!(
            "{}.url must be http(s): {}",
            label, endpoint.url
        )));
    }
    if endpoint.api_key.trim().is_empty() {
        return Err(Error::config(format!("{}.apiKey is empty", label)));
    }
    Ok(())
}
