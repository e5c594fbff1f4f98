use std::env;

use anyhow::Result;

/// Default number of rows requested per fetch.
pub const DEFAULT_FETCH_LIMIT: usize = 100;

/// Default cap on cached rows (older rows are evicted after a sync).
pub const DEFAULT_CACHE_MAX_ROWS: usize = 2000;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Nothing is
/// required up front; commands call the `require_*` checks they need.
pub struct Config {
    /// Base URL of the hosted backend (e.g. https://xyz.example.co).
    pub api_url: String,
    /// Public (anon) API key for read access.
    pub api_key: String,
    /// Resource queried for activity rows.
    pub posts_table: String,
    /// Optional `select` override for backends with different join names.
    pub select: Option<String>,
    pub db_path: String,
    /// Account id of the person reading the feed.
    pub viewer_id: String,
    pub fetch_limit: usize,
    pub cache_max_rows: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Ok(Self {
            api_url: env::var("UNIFEED_API_URL").unwrap_or_default(),
            api_key: env::var("UNIFEED_API_KEY").unwrap_or_default(),
            posts_table: env::var("UNIFEED_POSTS_TABLE").unwrap_or_else(|_| "posts".to_string()),
            select: env::var("UNIFEED_SELECT").ok().filter(|s| !s.trim().is_empty()),
            db_path: env::var("UNIFEED_DB_PATH").unwrap_or_else(|_| "./unifeed.db".to_string()),
            viewer_id: env::var("UNIFEED_VIEWER_ID").unwrap_or_default(),
            fetch_limit: parse_usize("UNIFEED_FETCH_LIMIT", DEFAULT_FETCH_LIMIT)?,
            cache_max_rows: parse_usize("UNIFEED_CACHE_MAX_ROWS", DEFAULT_CACHE_MAX_ROWS)?,
        })
    }

    /// Whether a hosted backend is configured at all.
    pub fn has_backend(&self) -> bool {
        !self.api_url.is_empty()
    }

    /// Check that the backend URL is configured.
    /// Call this before any operation that talks to the hosted backend.
    pub fn require_backend(&self) -> Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!(
                "UNIFEED_API_URL not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that the viewer id is configured.
    /// Call this before building a "following" feed.
    pub fn require_viewer(&self) -> Result<()> {
        if self.viewer_id.is_empty() {
            anyhow::bail!(
                "UNIFEED_VIEWER_ID not set. The following feed needs to know whose feed it is.\n\
                 Add it to your .env file."
            );
        }
        Ok(())
    }
}

fn parse_usize(var: &str, default: usize) -> Result<usize> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{var} must be a positive integer, got {raw:?}")),
        _ => Ok(default),
    }
}
