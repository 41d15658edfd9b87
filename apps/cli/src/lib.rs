//! # tablesync-cli
//!
//! Command-line driver for the table sync pipeline.
//!
//! ## Commands
//!
//! - `tablesync sync` - fetch, back up and replace every catalog table
//! - `tablesync backup` - fetch and back up only
//! - `tablesync restore` - replace destination tables from existing backups
//! - `tablesync generate-sql` - write the seed script from existing backups
//! - `tablesync check-config` - validate and print the configuration
//!
//! ## Configuration
//!
//! A JSON file (`--config`, or `TABLESYNC_CONFIG`) plus environment
//! overrides for endpoints and keys: `TABLESYNC_SOURCE_URL`,
//! `TABLESYNC_SOURCE_KEY`, `TABLESYNC_DEST_URL`, `TABLESYNC_DEST_KEY`.

pub mod commands;
pub mod context;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Back up remote tables and full-replace a local copy.
#[derive(Debug, Parser)]
#[command(name = "tablesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, short = 'c', env = "TABLESYNC_CONFIG", default_value = "tablesync.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch, back up and replace every catalog table.
    Sync(commands::run::RunArgs),
    /// Fetch and back up; the destination is not touched.
    Backup(commands::run::RunArgs),
    /// Replace destination tables from existing backups.
    Restore(commands::run::RunArgs),
    /// Write the SQL seed script from existing backups.
    GenerateSql(commands::generate_sql::GenerateSqlArgs),
    /// Validate the configuration and print it with keys masked.
    CheckConfig,
}

/// How a command finished, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// The run completed but at least one table failed.
    TableFailures,
}

impl RunStatus {
    pub const CONFIG_ERROR_CODE: u8 = 1;

    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::TableFailures => 2,
        }
    }
}
