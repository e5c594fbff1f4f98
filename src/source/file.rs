// File-backed row source — a JSON array of rows on disk.
//
// Used for offline fixtures and for replaying exported feeds.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::RowSource;
use crate::feed::row::rows_from_str;
use crate::feed::ActivityRow;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read and parse every row in the file.
    pub fn load(&self) -> Result<Vec<ActivityRow>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read rows from {}", self.path.display()))?;
        let rows = rows_from_str(&text)
            .with_context(|| format!("{} is not valid JSON", self.path.display()))?;
        info!(count = rows.len(), path = %self.path.display(), "Loaded activity rows from file");
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for FileSource {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<ActivityRow>> {
        let mut rows = self.load()?;
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<ActivityRow>> {
        let rows = self.load()?;
        Ok(rows.into_iter().filter(|row| ids.contains(&row.id)).collect())
    }
}
