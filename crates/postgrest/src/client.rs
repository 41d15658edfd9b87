//! PostgREST client used as the remote source and, optionally, the
//! destination of a sync run.
//!
//! Every call is a single request: no pagination, no retries.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use tablesync_core::errors::StoreResult;
use tablesync_core::sync::{records_from_json_str, DestinationStore, Record, SourceStore};

use crate::error::{PostgrestError, Result};
use crate::types::ApiErrorResponse;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Read/write access to the tables exposed by one PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

impl PostgrestClient {
    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("[Postgrest] Response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Postgrest] Response error ({}): {}", status, preview);
    }

    /// Create a client for `base_url` (e.g. `https://xyz.supabase.co/rest/v1`).
    ///
    /// `schema` selects a non-default schema through the profile headers.
    pub fn new(
        base_url: &str,
        api_key: &str,
        schema: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PostgrestError::auth("API key is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
            schema: schema
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(table))
    }

    fn headers(&self, direction: Direction) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key_value = HeaderValue::from_str(&self.api_key)
            .map_err(|_| PostgrestError::auth("Invalid API key format"))?;
        headers.insert("apikey", key_value);
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| PostgrestError::auth("Invalid API key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        if let Some(schema) = &self.schema {
            let profile = HeaderValue::from_str(schema)
                .map_err(|_| PostgrestError::invalid_request("Invalid schema name"))?;
            let name = match direction {
                Direction::Read => "accept-profile",
                Direction::Write => "content-profile",
            };
            headers.insert(name, profile);
        }

        Ok(headers)
    }

    /// Read the body and turn a non-2xx status into an API error.
    async fn check_response(response: reqwest::Response) -> Result<(HeaderMap, String)> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(PostgrestError::api(status.as_u16(), error.describe()));
            }
            return Err(PostgrestError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        Ok((headers, body))
    }

    /// Total from a `Content-Range` header such as `0-4/5` or `*/5`.
    fn parse_content_range_total(headers: &HeaderMap) -> Option<u64> {
        headers
            .get("content-range")?
            .to_str()
            .ok()?
            .rsplit_once('/')
            .and_then(|(_, total)| total.trim().parse::<u64>().ok())
    }

    /// GET every row of `table`.
    ///
    /// GET /{table}?select=*
    pub async fn select_all(&self, table: &str) -> Result<Vec<Record>> {
        let url = format!("{}?select=*", self.table_url(table));
        debug!("[Postgrest] Selecting all rows of '{}'", table);

        let response = self
            .client
            .get(&url)
            .headers(self.headers(Direction::Read)?)
            .send()
            .await?;
        let (_, body) = Self::check_response(response).await?;
        Ok(records_from_json_str(&body)?)
    }

    /// Delete every row where `key_column` is not null; returns the count.
    ///
    /// PostgREST refuses an unfiltered DELETE, so the key filter stands in
    /// for "match all".
    ///
    /// DELETE /{table}?{key_column}=not.is.null
    pub async fn delete_all(&self, table: &str, key_column: &str) -> Result<u64> {
        if key_column.trim().is_empty() {
            return Err(PostgrestError::invalid_request("Key column is empty"));
        }
        let url = format!(
            "{}?{}=not.is.null",
            self.table_url(table),
            urlencoding::encode(key_column)
        );
        debug!("[Postgrest] Deleting all rows of '{}'", table);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers(Direction::Write)?)
            .header("prefer", "return=minimal, count=exact")
            .send()
            .await?;
        let (headers, _) = Self::check_response(response).await?;
        Ok(Self::parse_content_range_total(&headers).unwrap_or_else(|| {
            warn!(
                "[Postgrest] No Content-Range on delete from '{}', count unknown",
                table
            );
            0
        }))
    }

    /// Bulk insert `records` in one request.
    ///
    /// Rows may carry different column sets; the union is sent as
    /// `columns=` so missing keys fall back to column defaults.
    ///
    /// POST /{table}?columns=a,b,c
    pub async fn insert_rows(&self, table: &str, records: &[Record]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut columns: Vec<&str> = Vec::new();
        for column in records.iter().flat_map(Record::columns) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        let url = format!(
            "{}?columns={}",
            self.table_url(table),
            columns
                .iter()
                .map(|c| urlencoding::encode(c).into_owned())
                .collect::<Vec<_>>()
                .join(",")
        );
        let body = serde_json::to_string(records)?;
        debug!(
            "[Postgrest] Inserting {} rows into '{}' ({} bytes)",
            records.len(),
            table,
            body.len()
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers(Direction::Write)?)
            .header("prefer", "return=minimal")
            .body(body)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(records.len() as u64)
    }
}

#[async_trait]
impl SourceStore for PostgrestClient {
    async fn fetch_all(&self, table: &str) -> StoreResult<Vec<Record>> {
        Ok(self.select_all(table).await?)
    }
}

/// Destination adapter: a client plus the column used for match-all deletes.
#[derive(Debug, Clone)]
pub struct PostgrestDestination {
    client: PostgrestClient,
    key_column: String,
}

impl PostgrestDestination {
    pub fn new(client: PostgrestClient, key_column: impl Into<String>) -> Self {
        Self {
            client,
            key_column: key_column.into(),
        }
    }

    pub fn client(&self) -> &PostgrestClient {
        &self.client
    }
}

#[async_trait]
impl DestinationStore for PostgrestDestination {
    async fn delete_all(&self, table: &str) -> StoreResult<u64> {
        Ok(self.client.delete_all(table, &self.key_column).await?)
    }

    async fn insert_all(&self, table: &str, records: &[Record]) -> StoreResult<u64> {
        Ok(self.client.insert_rows(table, records).await?)
    }
}
