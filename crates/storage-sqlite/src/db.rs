//! Connection pool setup.

use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Result, StorageError};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

const POOL_MAX_SIZE: u32 = 4;
const CONNECTION_TIMEOUT_SECS: u64 = 10;

/// Set per connection: wait on locks instead of failing.
#[derive(Debug)]
struct ConnectionOptions;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        use diesel::connection::SimpleConnection;
        conn.batch_execute("PRAGMA busy_timeout = 5000;")
            .map_err(r2d2::Error::QueryError)
    }
}

/// Open (creating if needed) the database file at `db_path`.
pub fn create_pool(db_path: &Path) -> Result<Arc<DbPool>> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            StorageError::Connection(format!("cannot create {}: {}", parent.display(), e))
        })?;
    }
    debug!("[Sqlite] Opening pool for {}", db_path.display());
    let manager = ConnectionManager::<SqliteConnection>::new(db_path.to_string_lossy());
    let pool = Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    Ok(pool.get()?)
}
