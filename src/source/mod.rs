// Row sources — where activity rows come from.
//
// The `RowSource` trait is the seam between the pure feed core and the
// outside world. Implementations: the hosted backend's REST interface, a
// JSON file on disk, and the local SQLite cache.

pub mod backfill;
pub mod file;
pub mod rest;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::Database;
use crate::feed::ActivityRow;

pub use backfill::backfill_snapshots;

/// Anything that can hand us activity rows.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// The most recent rows, newest first, at most `limit`.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<ActivityRow>>;

    /// Rows with the given ids. Missing ids are simply absent from the result.
    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ActivityRow>>;
}

/// Serves rows out of the offline cache.
pub struct CacheSource {
    db: Arc<dyn Database>,
}

impl CacheSource {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RowSource for CacheSource {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<ActivityRow>> {
        self.db.get_recent_rows(limit).await
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ActivityRow>> {
        self.db.get_rows_by_ids(ids).await
    }
}
