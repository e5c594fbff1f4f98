// Feed aggregation — merge repost echoes into their original post.
//
// Input: activity rows for one audience, any order. Output: display entries
// in the order their canonical identity was first seen scanning newest-first.
// Reposts collapse into a single entry per original with a deduplicated
// reposter list; quotes always stand alone.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::row::{ActivityRow, Author, RowKind};

/// One renderable unit: a main post plus the accounts that reposted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    pub main: ActivityRow,
    /// Distinct reposters, most recent first.
    pub reposters: Vec<Author>,
    pub is_repost_group: bool,
}

impl DisplayEntry {
    fn standalone(main: ActivityRow) -> Self {
        Self {
            main,
            reposters: Vec::new(),
            is_repost_group: false,
        }
    }

    /// Set-like insert keyed by author id. Returns false if the author was
    /// already listed (or has no identity to key on).
    fn add_reposter(&mut self, reposter: Author) -> bool {
        self.is_repost_group = true;
        if reposter.id.is_empty() || self.reposters.iter().any(|r| r.id == reposter.id) {
            return false;
        }
        self.reposters.push(reposter);
        true
    }

    /// True when `main` still holds repost metadata because the original's
    /// snapshot never arrived. Renderers show these as unavailable.
    pub fn is_stub(&self) -> bool {
        self.main.kind() == RowKind::Repost
    }

    /// True when `main` is a quote whose quoted post could not be embedded.
    pub fn quoted_post_missing(&self) -> bool {
        self.main.kind() == RowKind::Quote && self.main.original_post.is_none()
    }
}

/// Aggregate activity rows into display entries.
///
/// Pure: no I/O, never fails. Rows with no resolvable identity are skipped.
pub fn aggregate(rows: &[ActivityRow]) -> Vec<DisplayEntry> {
    // Stable sort so rows sharing a timestamp keep their input order.
    let mut ordered: Vec<&ActivityRow> = rows.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let mut entries: Vec<DisplayEntry> = Vec::with_capacity(ordered.len());
    let mut by_identity: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in ordered {
        let kind = row.kind();

        if kind == RowKind::Quote {
            entries.push(DisplayEntry::standalone(row.clone()));
            continue;
        }

        let Some(key) = row.canonical_id() else {
            debug!(row_id = row.id.as_str(), kind = %kind, "Skipping row with no canonical identity");
            skipped += 1;
            continue;
        };

        match by_identity.get(key).copied() {
            None => {
                let mut entry = match (kind, row.original_post.as_deref()) {
                    (RowKind::Repost, Some(snapshot)) => {
                        let mut main = snapshot.clone();
                        if main.id.trim().is_empty() {
                            main.id = key.to_string();
                        }
                        DisplayEntry::standalone(main)
                    }
                    _ => DisplayEntry::standalone(row.clone()),
                };
                if kind == RowKind::Repost {
                    entry.add_reposter(row.reposter());
                }
                by_identity.insert(key.to_string(), entries.len());
                entries.push(entry);
            }
            Some(position) => {
                let entry = &mut entries[position];
                if kind == RowKind::Repost {
                    // A stub founded by a join-less repost adopts the first
                    // snapshot a later echo carries.
                    if let (true, Some(snapshot)) = (entry.is_stub(), row.original_post.as_deref()) {
                        entry.main = snapshot.clone();
                        if entry.main.id.trim().is_empty() {
                            entry.main.id = key.to_string();
                        }
                    }
                    entry.add_reposter(row.reposter());
                } else {
                    // The original arrived after one of its echoes: its
                    // fetched columns supersede the snapshot.
                    entry.main.overlay(row);
                }
            }
        }
    }

    if skipped > 0 {
        debug!(skipped, entries = entries.len(), "Aggregated feed with skipped rows");
    }

    entries
}
