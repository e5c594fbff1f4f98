// Snapshot backfill — fill in missing `original_post` embeds before aggregation.
//
// A repost or quote can arrive without the snapshot of the post it points
// at (the join was skipped, or the row came over the real-time channel).
// We resolve those from rows already in hand first, then with by-id lookups
// against a source. Whatever is still missing after that renders as
// "original post unavailable"; backfill never fails the feed.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::RowSource;
use crate::feed::ActivityRow;

/// Ids per by-id request.
const BACKFILL_CHUNK: usize = 50;

/// By-id requests in flight at once.
const BACKFILL_CONCURRENCY: usize = 4;

/// What a backfill pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Snapshots filled from rows already in the batch.
    pub local: usize,
    /// Snapshots filled from by-id lookups.
    pub fetched: usize,
    /// Rows whose target could not be found anywhere.
    pub unresolved: usize,
}

/// Fill missing snapshots in place, from the batch itself and then `source`.
pub async fn backfill_snapshots(source: &dyn RowSource, rows: &mut [ActivityRow]) -> BackfillReport {
    let mut report = BackfillReport {
        local: fill_from_batch(rows),
        ..BackfillReport::default()
    };

    let missing = missing_targets(rows);
    if missing.is_empty() {
        return report;
    }

    let results: Vec<anyhow::Result<Vec<ActivityRow>>> = stream::iter(missing.chunks(BACKFILL_CHUNK))
        .map(|chunk| source.fetch_by_ids(chunk))
        .buffer_unordered(BACKFILL_CONCURRENCY)
        .collect()
        .await;

    let mut found: HashMap<String, ActivityRow> = HashMap::new();
    for result in results {
        match result {
            Ok(originals) => {
                for original in originals {
                    found.insert(original.id.clone(), original);
                }
            }
            Err(e) => warn!(error = %e, "Snapshot lookup failed, leaving stubs in place"),
        }
    }

    report.fetched = embed(rows, &found);
    report.unresolved = missing_targets(rows).len();
    if report.unresolved > 0 {
        info!(unresolved = report.unresolved, "Some referenced posts are unavailable");
    }
    report
}

/// Target ids of reposts/quotes that lack a snapshot, deduplicated, in
/// first-seen order.
pub fn missing_targets(rows: &[ActivityRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| row.original_post.is_none())
        .filter_map(|row| row.target_id())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Fill snapshots from referenced rows present in the same batch. The
/// target may be of any kind: reposting a quote embeds the quote.
pub fn fill_from_batch(rows: &mut [ActivityRow]) -> usize {
    let wanted: HashSet<String> = missing_targets(rows).into_iter().collect();
    if wanted.is_empty() {
        return 0;
    }
    let originals: HashMap<String, ActivityRow> = rows
        .iter()
        .filter(|row| wanted.contains(&row.id))
        .map(|row| (row.id.clone(), row.clone()))
        .collect();
    embed(rows, &originals)
}

fn embed(rows: &mut [ActivityRow], originals: &HashMap<String, ActivityRow>) -> usize {
    let mut filled = 0;
    for row in rows.iter_mut().filter(|row| row.original_post.is_none()) {
        let snapshot = row.target_id().and_then(|target| originals.get(target));
        if let Some(original) = snapshot {
            row.original_post = Some(Box::new(original.clone()));
            filled += 1;
        }
    }
    filled
}
