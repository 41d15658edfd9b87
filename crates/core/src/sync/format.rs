//! Value formatting: SQL literals and identifiers.

use super::value::Value;

/// Cast marker appended to structured JSON literals.
pub const JSON_CAST: &str = "::jsonb";

/// Target SQL flavour for literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// `TRUE`/`FALSE`, JSON literals cast with `::jsonb`.
    #[default]
    Postgres,
    /// `1`/`0`, JSON stored as plain text.
    Sqlite,
}

impl SqlDialect {
    fn boolean(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Postgres, true) => "TRUE",
            (Self::Postgres, false) => "FALSE",
            (Self::Sqlite, true) => "1",
            (Self::Sqlite, false) => "0",
        }
    }

    fn json_cast(self) -> &'static str {
        match self {
            Self::Postgres => JSON_CAST,
            Self::Sqlite => "",
        }
    }
}

pub fn escape_sql_str(value: &str) -> String {
    value.replace('\'', "''")
}

pub fn quote_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// `"schema"."table"`, or just `"table"` without a schema.
pub fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema.filter(|s| !s.is_empty()) {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(table)),
        None => quote_identifier(table),
    }
}

/// Postgres literal for a value.
pub fn format_literal(value: &Value) -> String {
    format_literal_for(value, SqlDialect::Postgres)
}

pub fn format_literal_for(value: &Value, dialect: SqlDialect) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Number(v) => v.to_string(),
        Value::Boolean(v) => dialect.boolean(*v).to_string(),
        Value::Text(v) => format!("'{}'", escape_sql_str(v)),
        Value::Json(v) => format!(
            "'{}'{}",
            escape_sql_str(&v.to_string()),
            dialect.json_cast()
        ),
    }
}

/// Reverse of [`format_literal`]. Returns `None` for text that is not a
/// literal this module produces.
pub fn parse_literal(literal: &str) -> Option<Value> {
    let literal = literal.trim();
    match literal {
        "NULL" => return Some(Value::Null),
        "TRUE" => return Some(Value::Boolean(true)),
        "FALSE" => return Some(Value::Boolean(false)),
        _ => {}
    }

    if let Some(rest) = literal.strip_prefix('\'') {
        let (body, suffix) = split_quoted(rest)?;
        return match suffix {
            "" => Some(Value::Text(body)),
            "::jsonb" | "::json" => serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .map(Value::Json),
            _ => None,
        };
    }

    serde_json::from_str::<serde_json::Number>(literal)
        .ok()
        .map(Value::Number)
}

/// Split `body'suffix` at the closing quote, undoing quote doubling.
fn split_quoted(rest: &str) -> Option<(String, &str)> {
    let mut body = String::with_capacity(rest.len());
    let mut chars = rest.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        if ch != '\'' {
            body.push(ch);
            continue;
        }
        if matches!(chars.peek(), Some((_, '\''))) {
            chars.next();
            body.push('\'');
            continue;
        }
        return Some((body, &rest[idx + 1..]));
    }
    None
}
