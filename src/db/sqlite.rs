// SqliteDatabase — rusqlite backend implementing the Database trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::traits::Database;
use crate::feed::ActivityRow;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn get_sync_state(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        super::queries::get_sync_state(&conn, key)
    }

    async fn set_sync_state(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::set_sync_state(&conn, key, value)
    }

    async fn upsert_rows(&self, rows: &[ActivityRow]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::upsert_rows(&conn, rows)
    }

    async fn get_recent_rows(&self, limit: usize) -> Result<Vec<ActivityRow>> {
        let conn = self.conn.lock().await;
        super::queries::get_recent_rows(&conn, limit)
    }

    async fn get_rows_by_ids(&self, ids: &[String]) -> Result<Vec<ActivityRow>> {
        let conn = self.conn.lock().await;
        super::queries::get_rows_by_ids(&conn, ids)
    }

    async fn delete_row(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::delete_row(&conn, id)
    }

    async fn row_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::row_count(&conn)
    }

    async fn count_dangling_targets(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_dangling_targets(&conn)
    }

    async fn prune_rows(&self, keep: usize) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::prune_rows(&conn, keep)
    }
}
