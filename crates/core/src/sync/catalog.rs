//! Table catalog: the declared processing order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::{Error, Result};

/// A table and its position in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub name: String,
    pub position: usize,
}

/// Ordered list of tables. Parents must precede children; the order is taken
/// as given and never inferred from the destination schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCatalog {
    tables: Vec<TableSpec>,
}

/// Plain SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TableCatalog {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut tables = Vec::new();
        for (position, name) in names.into_iter().enumerate() {
            let name = name.into().trim().to_string();
            if !is_valid_identifier(&name) {
                return Err(Error::catalog(format!(
                    "'{}' is not a valid table identifier",
                    name
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::catalog(format!("table '{}' is listed twice", name)));
            }
            tables.push(TableSpec { name, position });
        }
        if tables.is_empty() {
            return Err(Error::catalog("no tables configured"));
        }
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableSpec> {
        self.tables.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    /// Sub-catalog of the named tables, kept in catalog order with their
    /// original positions. An empty filter returns the whole catalog.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        if let Some(unknown) = names.iter().find(|name| !self.contains(name)) {
            return Err(Error::catalog(format!(
                "table '{}' is not in the catalog",
                unknown
            )));
        }
        let tables = self
            .tables
            .iter()
            .filter(|t| names.iter().any(|name| *name == t.name))
            .cloned()
            .collect();
        Ok(Self { tables })
    }
}
