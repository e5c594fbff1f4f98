// Database schema — table creation and migrations.
//
// Same scheme throughout: a `schema_version` table records which migrations
// have run, and each migration is a closure executing its SQL once.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Activity rows cached for offline reading.
        -- The full row (joins included) is kept as JSON so the backend's
        -- shape can change without a migration.
        CREATE TABLE IF NOT EXISTS activity_rows (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL DEFAULT '',   -- RFC 3339, UTC, fixed width
            author_id TEXT NOT NULL DEFAULT '',
            row_json TEXT NOT NULL,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Sync state: last sync time, row counts, etc.
        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Newest-first reads
        CREATE INDEX IF NOT EXISTS idx_rows_created
            ON activity_rows(created_at);
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: original_post_id column so stub repair can find rows
    // pointing at a given post without decoding every row_json.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "ALTER TABLE activity_rows ADD COLUMN original_post_id TEXT;
             CREATE INDEX IF NOT EXISTS idx_rows_target ON activity_rows(original_post_id);",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
