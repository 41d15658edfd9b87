//! SQLite destination for tablesync, on diesel with an r2d2 pool.

pub mod db;
pub mod errors;
pub mod sync;

pub use db::{create_pool, get_connection, DbPool};
pub use errors::StorageError;
pub use sync::SqliteDestination;
