//! Full-replace writes into a local SQLite database.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use tablesync_core::errors::StoreResult;
use tablesync_core::sync::{
    format_literal_for, quote_identifier, DestinationStore, Record, SqlDialect,
};

use crate::db::{get_connection, DbPool};
use crate::errors::{Result, StorageError};

fn escape_sqlite_str(value: &str) -> String {
    value.replace('\'', "''")
}

#[derive(diesel::QueryableByName)]
struct PragmaTableInfoRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    name: String,
}

/// Column names of `table_name`, in declaration order. Empty when the table
/// does not exist.
pub fn load_table_columns(conn: &mut SqliteConnection, table_name: &str) -> Result<Vec<String>> {
    let pragma_sql = format!(
        "PRAGMA main.table_info('{}')",
        escape_sqlite_str(table_name)
    );
    let columns = diesel::sql_query(pragma_sql)
        .load::<PragmaTableInfoRow>(conn)?
        .into_iter()
        .map(|row| row.name)
        .collect::<Vec<_>>();
    Ok(columns)
}

fn require_table(conn: &mut SqliteConnection, table_name: &str) -> Result<HashSet<String>> {
    let columns = load_table_columns(conn, table_name)?;
    if columns.is_empty() {
        return Err(StorageError::Schema(format!(
            "table '{}' does not exist",
            table_name
        )));
    }
    Ok(columns.into_iter().collect())
}

fn validate_record_columns(
    known_columns: &HashSet<String>,
    table_name: &str,
    records: &[Record],
) -> Result<()> {
    for column in records.iter().flat_map(Record::columns) {
        if !known_columns.contains(column) {
            return Err(StorageError::Schema(format!(
                "column '{}' is not valid for table '{}'",
                column, table_name
            )));
        }
    }
    Ok(())
}

fn insert_sql(table_name: &str, record: &Record) -> String {
    let columns = record
        .columns()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ");
    let values = record
        .iter()
        .map(|(_, value)| format_literal_for(value, SqlDialect::Sqlite))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table_name),
        columns,
        values
    )
}

/// Destination store over a local SQLite file.
///
/// Inserts for one table run in a single immediate transaction, so a failed
/// insert leaves the table as the preceding delete left it: empty.
pub struct SqliteDestination {
    pool: Arc<DbPool>,
}

impl SqliteDestination {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn delete_all_impl(pool: &DbPool, table: &str) -> Result<u64> {
        let mut conn = get_connection(pool)?;
        require_table(&mut conn, table)?;
        let deleted = diesel::sql_query(format!("DELETE FROM {}", quote_identifier(table)))
            .execute(&mut conn)?;
        debug!("[Sqlite] Deleted {} rows from '{}'", deleted, table);
        Ok(deleted as u64)
    }

    fn insert_all_impl(pool: &DbPool, table: &str, records: &[Record]) -> Result<u64> {
        let mut conn = get_connection(pool)?;
        let known_columns = require_table(&mut conn, table)?;
        validate_record_columns(&known_columns, table, records)?;

        let inserted = conn.immediate_transaction::<_, StorageError, _>(|tx| {
            let mut inserted = 0_u64;
            for record in records.iter().filter(|r| !r.is_empty()) {
                inserted += diesel::sql_query(insert_sql(table, record)).execute(tx)? as u64;
            }
            Ok(inserted)
        })?;
        debug!("[Sqlite] Inserted {} rows into '{}'", inserted, table);
        Ok(inserted)
    }
}

#[async_trait]
impl DestinationStore for SqliteDestination {
    async fn delete_all(&self, table: &str) -> StoreResult<u64> {
        let pool = Arc::clone(&self.pool);
        let table = table.to_string();
        let result = tokio::task::spawn_blocking(move || Self::delete_all_impl(&pool, &table))
            .await
            .map_err(|e| StorageError::Worker(e.to_string()))?;
        Ok(result?)
    }

    async fn insert_all(&self, table: &str, records: &[Record]) -> StoreResult<u64> {
        let pool = Arc::clone(&self.pool);
        let table = table.to_string();
        let records = records.to_vec();
        let result =
            tokio::task::spawn_blocking(move || Self::insert_all_impl(&pool, &table, &records))
                .await
                .map_err(|e| StorageError::Worker(e.to_string()))?;
        Ok(result?)
    }
}
