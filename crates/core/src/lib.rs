//! Core of tablesync: value model, table catalog, backup store, SQL
//! generation and the per-table sync pipeline. Remote and local database
//! access lives in the adapter crates behind the traits in [`sync`].

pub mod config;
pub mod errors;
pub mod sync;

pub use config::{DestinationConfig, EndpointConfig, SyncConfig};
pub use errors::{Error, ErrorKind, Result, StoreError, StoreErrorKind, StoreResult};
