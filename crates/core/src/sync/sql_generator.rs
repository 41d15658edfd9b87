//! SQL script generation from stored backups.
//!
//! Works purely over the backup store. The output contains no timestamps or
//! run ids, so unchanged backups always produce byte-identical scripts.

use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;

use super::backup::write_atomic;
use super::catalog::TableCatalog;
use super::format::{format_literal, qualified_table, quote_identifier};
use super::snapshot_model::Snapshot;
use super::store::BackupStore;
use super::value::{Record, Value};
use crate::errors::{Error, Result};

pub const DEFAULT_SCHEMA: &str = "public";

pub struct SqlGenerator {
    backups: Arc<dyn BackupStore>,
    schema: Option<String>,
}

impl SqlGenerator {
    pub fn new(backups: Arc<dyn BackupStore>) -> Self {
        Self {
            backups,
            schema: Some(DEFAULT_SCHEMA.to_string()),
        }
    }

    /// Schema used to qualify `INSERT INTO` targets; `None` leaves them bare.
    pub fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema.filter(|s| !s.trim().is_empty());
        self
    }

    /// Render one section per catalog table, in catalog order. A table whose
    /// backup cannot be read degrades to a comment; generation never fails.
    pub async fn generate(&self, catalog: &TableCatalog) -> String {
        let mut script = String::new();
        for spec in catalog.iter() {
            let section = match self.backups.load(&spec.name).await {
                Ok(snapshot) => render_section(self.schema.as_deref(), &snapshot),
                Err(Error::BackupNotFound(_)) => {
                    debug!("[SqlGen] No backup for '{}'", spec.name);
                    format!("-- {}: never backed up, no rows generated\n", spec.name)
                }
                Err(err) => {
                    warn!("[SqlGen] Skipping '{}': {}", spec.name, err);
                    format!(
                        "-- {}: backup unreadable, no rows generated ({})\n",
                        spec.name,
                        single_line(&err.to_string())
                    )
                }
            };
            script.push_str(&section);
            script.push('\n');
        }
        script
    }

    /// Generate and write the script atomically; returns the bytes written.
    pub async fn write_to(&self, catalog: &TableCatalog, path: &Path) -> Result<usize> {
        let script = self.generate(catalog).await;
        write_atomic(path, script.as_bytes()).await?;
        debug!(
            "[SqlGen] Wrote {} bytes for {} tables to {}",
            script.len(),
            catalog.len(),
            path.display()
        );
        Ok(script.len())
    }
}

/// Comment line plus one `INSERT` per record. Columns come from the first
/// record; a later record missing one of them renders `NULL` there, and
/// columns the first record lacks are not emitted.
pub fn render_section(schema: Option<&str>, snapshot: &Snapshot) -> String {
    let table = snapshot.table();
    if snapshot.is_empty() {
        return section_header(table, 0);
    }

    let target = qualified_table(schema, table);
    let columns = snapshot.columns();
    let mut section = section_header(table, snapshot.len());
    for record in snapshot.records() {
        section.push_str(&insert_statement(&target, &columns, record));
        section.push('\n');
    }
    section
}

fn section_header(table: &str, rows: usize) -> String {
    let noun = if rows == 1 { "row" } else { "rows" };
    format!("-- {}: {} {}\n", table, rows, noun)
}

pub fn insert_statement(target: &str, columns: &[&str], record: &Record) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let values = columns
        .iter()
        .map(|c| format_literal(record.get(c).unwrap_or(&Value::Null)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) VALUES ({});", target, column_list, values)
}

fn single_line(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::backup::FileBackupStore;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn insert_uses_first_record_columns() {
        let first = Record::new().with("id", 1_i64).with("name", "a");
        let second = Record::new()
            .with("name", "b")
            .with("id", 2_i64)
            .with("extra", true);
        let third = Record::new().with("id", 3_i64);
        let snapshot = Snapshot::new("tags", vec![first, second, third]);

        let section = render_section(None, &snapshot);
        let lines = section.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "-- tags: 3 rows");
        assert_eq!(
            lines[1],
            "INSERT INTO \"tags\" (\"id\", \"name\") VALUES (1, 'a');"
        );
        assert_eq!(
            lines[2],
            "INSERT INTO \"tags\" (\"id\", \"name\") VALUES (2, 'b');"
        );
        assert_eq!(
            lines[3],
            "INSERT INTO \"tags\" (\"id\", \"name\") VALUES (3, NULL);"
        );
    }

    #[test]
    fn header_counts_rows_in_plain_english() {
        let one = Snapshot::new("quizzes", vec![Record::new().with("id", 1_i64)]);
        let two = Snapshot::new(
            "quizzes",
            vec![Record::new().with("id", 1_i64), Record::new().with("id", 2_i64)],
        );
        let none = Snapshot::new("quizzes", Vec::new());

        assert!(render_section(None, &one).starts_with("-- quizzes: 1 row\n"));
        assert!(render_section(None, &two).starts_with("-- quizzes: 2 rows\n"));
        assert_eq!(render_section(None, &none), "-- quizzes: 0 rows\n");
    }

    #[tokio::test]
    async fn sections_follow_catalog_order_and_degrade_per_table() {
        let dir = tempdir().expect("tempdir");
        let store = Arc::new(FileBackupStore::new(dir.path()));
        store
            .save(&Snapshot::new(
                "quizzes",
                vec![Record::new().with("id", 10_i64).with("meta", json!({"q": "it's"}))],
            ))
            .await
            .expect("save quizzes");
        store
            .save(&Snapshot::new("answers", Vec::new()))
            .await
            .expect("save answers");
        std::fs::write(store.artifact_path("scores"), b"{not json").expect("write broken");

        let catalog =
            TableCatalog::new(["quiz_types", "quizzes", "scores", "answers"]).expect("catalog");
        let script = SqlGenerator::new(store).generate(&catalog).await;

        let expected = "\
-- quiz_types: never backed up, no rows generated

-- quizzes: 1 row
INSERT INTO \"public\".\"quizzes\" (\"id\", \"meta\") VALUES (10, '{\"q\":\"it''s\"}'::jsonb);

";
        assert!(script.starts_with(expected), "{}", script);
        assert!(script.contains("-- scores: backup unreadable"));
        assert!(script.ends_with("-- answers: 0 rows\n\n"));
    }
}
