// Hosted backend client — activity rows over the backend's REST interface.
//
// The backend exposes each table as a REST resource with query-string
// filters (`order=created_at.desc`, `id=in.(...)`) and embeds joined rows
// via the `select` parameter. Only reads live here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::RowSource;
use crate::feed::row::rows_from_json;
use crate::feed::ActivityRow;

/// Default projection: every post column, the author profile, and a snapshot
/// of the referenced post with its own author.
pub const DEFAULT_SELECT: &str =
    "*,author:profiles(*),original_post:posts!original_post_id(*,author:profiles(*))";

/// Unauthenticated (anon-key) reader for the posts resource.
pub struct RestSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    select: String,
}

impl RestSource {
    /// Create a client for `{base_url}/rest/v1/{table}`.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("unifeed/0.1 (feed-client)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
            select: DEFAULT_SELECT.to_string(),
        })
    }

    /// Override the `select` projection (for backends with different join names).
    pub fn with_select(mut self, select: &str) -> Self {
        self.select = select.to_string();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// GET the resource with extra query parameters and parse the rows.
    async fn get_rows(&self, params: &[(&str, &str)]) -> Result<Vec<ActivityRow>> {
        let url = self.endpoint();
        debug!(table = self.table.as_str(), "REST GET request");

        let mut request = self
            .client
            .get(&url)
            .query(&[("select", self.select.as_str())])
            .query(params);
        if !self.api_key.is_empty() {
            request = request
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {url} returned {status}: {body}");
        }

        let value: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to decode rows from {url}"))?;
        Ok(rows_from_json(value))
    }
}

#[async_trait]
impl RowSource for RestSource {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<ActivityRow>> {
        let limit = limit.to_string();
        let rows = self
            .get_rows(&[("order", "created_at.desc"), ("limit", &limit)])
            .await?;
        info!(count = rows.len(), "Fetched recent activity rows");
        Ok(rows)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ActivityRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = in_filter(ids);
        self.get_rows(&[("id", &filter)]).await
    }
}

/// Build an `in.(...)` filter value. Every id is double-quoted so commas and
/// parentheses inside ids can't break the list.
pub fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}
