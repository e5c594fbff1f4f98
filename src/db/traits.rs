// Database trait — backend-agnostic async interface for the offline cache.
//
// Implementor: SqliteDatabase (wraps rusqlite). Methods are async so the
// cache can sit behind the same `Arc<dyn Database>` as async row sources
// without blocking the runtime on a lock.

use anyhow::Result;
use async_trait::async_trait;

use crate::feed::ActivityRow;

#[async_trait]
pub trait Database: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Sync state ---

    /// Get a sync state value by key (e.g., "last_sync_at").
    async fn get_sync_state(&self, key: &str) -> Result<Option<String>>;

    /// Set a sync state value (upsert).
    async fn set_sync_state(&self, key: &str, value: &str) -> Result<()>;

    // --- Activity rows ---

    /// Save or update rows; returns how many were written.
    async fn upsert_rows(&self, rows: &[ActivityRow]) -> Result<usize>;

    /// The most recent cached rows, newest first.
    async fn get_recent_rows(&self, limit: usize) -> Result<Vec<ActivityRow>>;

    /// Cached rows with the given ids.
    async fn get_rows_by_ids(&self, ids: &[String]) -> Result<Vec<ActivityRow>>;

    /// Remove a row; returns whether it existed.
    async fn delete_row(&self, id: &str) -> Result<bool>;

    /// Number of cached rows.
    async fn row_count(&self) -> Result<i64>;

    /// Cached reposts/quotes whose target isn't cached.
    async fn count_dangling_targets(&self) -> Result<i64>;

    /// Evict all but the newest `keep` rows; returns how many were evicted.
    async fn prune_rows(&self, keep: usize) -> Result<usize>;
}
