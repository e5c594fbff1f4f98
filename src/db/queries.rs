// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use chrono::SecondsFormat;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::warn;

use crate::feed::ActivityRow;

// --- Sync state ---

/// Get a sync state value by key (e.g., "last_sync_at").
pub fn get_sync_state(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM sync_state WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a sync state value (upsert).
pub fn set_sync_state(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO sync_state (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

// --- Activity rows ---

/// Sort key stored alongside each row. Fixed-width UTC so string order is
/// time order; rows without a timestamp sort oldest.
pub fn sortable_timestamp(row: &ActivityRow) -> String {
    row.created_at
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_default()
}

/// Save or update rows. Rows without an id can't be keyed and are skipped.
/// Returns how many rows were written.
pub fn upsert_rows(conn: &Connection, rows: &[ActivityRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut stored = 0;

    for row in rows {
        if row.id.trim().is_empty() {
            continue;
        }
        let row_json = serde_json::to_string(row)?;
        tx.execute(
            "INSERT INTO activity_rows (id, created_at, author_id, row_json, original_post_id, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                created_at = ?2,
                author_id = ?3,
                row_json = ?4,
                original_post_id = ?5,
                fetched_at = datetime('now')",
            params![
                row.id,
                sortable_timestamp(row),
                row.author_identity(),
                row_json,
                row.target_id(),
            ],
        )?;
        stored += 1;
    }

    tx.commit()?;
    Ok(stored)
}

/// The most recent cached rows, newest first.
pub fn get_recent_rows(conn: &Connection, limit: usize) -> Result<Vec<ActivityRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, row_json FROM activity_rows ORDER BY created_at DESC, id LIMIT ?1",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let stored = stmt
        .query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
    Ok(decode_rows(stored))
}

/// Cached rows with the given ids, newest first. Unknown ids are ignored.
pub fn get_rows_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<ActivityRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!(
        "SELECT id, row_json FROM activity_rows WHERE id IN ({placeholders})
         ORDER BY created_at DESC, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let stored = stmt
        .query_map(params_from_iter(ids.iter()), |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
    Ok(decode_rows(stored))
}

/// Remove a row. Returns whether it existed.
pub fn delete_row(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM activity_rows WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Number of cached rows.
pub fn row_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM activity_rows", [], |row| row.get(0))?;
    Ok(count)
}

/// Number of cached reposts/quotes whose target post isn't cached.
pub fn count_dangling_targets(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM activity_rows
         WHERE original_post_id IS NOT NULL
           AND original_post_id NOT IN (SELECT id FROM activity_rows)",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Keep only the newest `keep` rows. Returns how many were evicted.
pub fn prune_rows(conn: &Connection, keep: usize) -> Result<usize> {
    let evicted = conn.execute(
        "DELETE FROM activity_rows WHERE id NOT IN (
            SELECT id FROM activity_rows ORDER BY created_at DESC, id LIMIT ?1
         )",
        params![i64::try_from(keep).unwrap_or(i64::MAX)],
    )?;
    Ok(evicted)
}

/// Decode stored row JSON, skipping anything that no longer parses.
fn decode_rows(stored: Vec<(String, String)>) -> Vec<ActivityRow> {
    stored
        .into_iter()
        .filter_map(|(id, json)| match serde_json::from_str::<ActivityRow>(&json) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(id = id.as_str(), error = %e, "Skipping undecodable cached row");
                None
            }
        })
        .collect()
}
