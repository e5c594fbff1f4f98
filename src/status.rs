// Cache status display — location, size, row counts, last sync.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::Database;

/// Display cache status to the terminal.
pub async fn show(db: &Arc<dyn Database>, db_path: &str) -> Result<()> {
    // Database file size
    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Cache: {} ({})", db_path, file_size);

    let rows = db.row_count().await?;
    println!("Cached rows: {rows}");

    let dangling = db.count_dangling_targets().await?;
    if dangling > 0 {
        println!("  {dangling} reposts/quotes point at posts that aren't cached");
    }

    match db.get_sync_state("last_sync_at").await? {
        Some(last_sync) => {
            println!("Last sync: {}", last_sync);
            if let Some(fetched) = db.get_sync_state("last_sync_rows").await? {
                println!("  Rows fetched: {fetched}");
            }
        }
        None => {
            println!("Last sync: never");
            println!("  Run `unifeed sync` to fetch the feed");
        }
    }

    Ok(())
}

/// Whether the cache file exists yet.
pub fn cache_exists(db_path: &str) -> bool {
    Path::new(db_path).exists()
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
