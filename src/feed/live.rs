// Live feed state — the in-memory row collection behind an open feed view.
//
// Two things feed it: fetch results (whole snapshots) and real-time events
// (single-row changes pushed by the backend). Events are applied one at a
// time in arrival order, so counter changes for a post land in the order
// they were sent. A fetch that completes after the view moved on (or after a
// newer fetch started) is discarded.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::aggregate::{aggregate, DisplayEntry};
use super::row::ActivityRow;

/// Which engagement counter an event touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Comments,
    Shares,
}

impl Counter {
    /// Map a backend table name to the counter it feeds.
    pub fn from_table(table: &str) -> Option<Self> {
        match table {
            "likes" | "post_likes" => Some(Counter::Likes),
            "comments" | "post_comments" => Some(Counter::Comments),
            "shares" | "post_shares" => Some(Counter::Shares),
            _ => None,
        }
    }
}

/// A single change to the row collection.
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    Insert(ActivityRow),
    Update(ActivityRow),
    Delete { id: String },
    Counter {
        post_id: String,
        counter: Counter,
        delta: i64,
    },
}

/// Change payload as delivered by the backend's real-time channel.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimePayload {
    #[serde(alias = "eventType", alias = "type")]
    pub event_type: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl RowEvent {
    /// Translate a real-time payload into a row event.
    ///
    /// Changes on the posts table become row events; inserts and deletes on
    /// like/comment/share tables become counter deltas for the referenced
    /// post. Anything else (unknown table, missing record) yields `None`.
    pub fn from_payload(payload: RealtimePayload) -> Option<RowEvent> {
        let event_type = payload.event_type.to_ascii_uppercase();
        let table = payload.table.as_deref().unwrap_or("posts");

        if let Some(counter) = Counter::from_table(table) {
            let (record, delta) = match event_type.as_str() {
                "INSERT" => (payload.new?, 1),
                "DELETE" => (payload.old?, -1),
                _ => return None,
            };
            let post_id = string_field(&record, "post_id")?;
            return Some(RowEvent::Counter {
                post_id,
                counter,
                delta,
            });
        }

        if table != "posts" {
            return None;
        }

        match event_type.as_str() {
            "INSERT" => serde_json::from_value(payload.new?).ok().map(RowEvent::Insert),
            "UPDATE" => serde_json::from_value(payload.new?).ok().map(RowEvent::Update),
            "DELETE" => {
                let id = string_field(&payload.old?, "id")?;
                Some(RowEvent::Delete { id })
            }
            _ => None,
        }
    }
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON-lines stream of real-time payloads. Blank lines are ignored;
/// lines that don't parse or don't map to an event are logged and skipped.
pub fn events_from_jsonl(text: &str) -> Vec<RowEvent> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| {
            match serde_json::from_str::<RealtimePayload>(line) {
                Ok(payload) => {
                    let event = RowEvent::from_payload(payload);
                    if event.is_none() {
                        debug!(line = index + 1, "Ignoring real-time payload with no feed effect");
                    }
                    event
                }
                Err(e) => {
                    warn!(line = index + 1, error = %e, "Skipping unparseable real-time payload");
                    None
                }
            }
        })
        .collect()
}

/// Handle for an in-flight fetch. Only the most recently issued ticket can
/// complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// Current row snapshot for one feed view.
#[derive(Debug, Clone, Default)]
pub struct LiveFeed {
    rows: Vec<ActivityRow>,
    generation: u64,
}

impl LiveFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<ActivityRow>) -> Self {
        Self {
            rows,
            generation: 0,
        }
    }

    pub fn rows(&self) -> &[ActivityRow] {
        &self.rows
    }

    /// Start a fetch. Any ticket issued earlier becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
        }
    }

    /// The view went away: pending fetches complete as no-ops.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Install fetched rows if `ticket` is still current. Returns whether the
    /// snapshot was replaced.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, rows: Vec<ActivityRow>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale fetch result"
            );
            return false;
        }
        self.rows = rows;
        true
    }

    /// Apply one event. Returns whether the collection changed.
    pub fn apply(&mut self, event: RowEvent) -> bool {
        match event {
            RowEvent::Insert(mut row) => {
                if self.touch(&row.id.clone(), |existing| existing.overlay(&row)) {
                    return true;
                }
                self.embed_local_snapshot(&mut row);
                self.rows.push(row);
                true
            }
            RowEvent::Update(row) => self.touch(&row.id.clone(), |existing| existing.overlay(&row)),
            RowEvent::Delete { id } => self.remove(&id),
            RowEvent::Counter {
                post_id,
                counter,
                delta,
            } => self.touch(&post_id, |row| {
                let slot = match counter {
                    Counter::Likes => &mut row.likes,
                    Counter::Comments => &mut row.comments,
                    Counter::Shares => &mut row.shares,
                };
                *slot = slot.saturating_add_signed(delta);
            }),
        }
    }

    /// Aggregate the current snapshot.
    pub fn entries(&self) -> Vec<DisplayEntry> {
        aggregate(&self.rows)
    }

    /// Run `f` on the row with `id` and on every embedded snapshot of it, so
    /// repost groups show the same numbers as the original.
    fn touch<F>(&mut self, id: &str, mut f: F) -> bool
    where
        F: FnMut(&mut ActivityRow),
    {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        let mut found = false;
        for row in &mut self.rows {
            if row.id == id {
                f(row);
                found = true;
            } else if let Some(snapshot) = row.original_post.as_deref_mut() {
                if snapshot.id == id {
                    f(snapshot);
                    found = true;
                }
            }
        }
        if !found {
            debug!(id, "Event for a post not in this feed, ignoring");
        }
        found
    }

    /// Drop a row and detach snapshots of it: reposts of a deleted post turn
    /// into stubs, quotes keep their own content.
    fn remove(&mut self, id: &str) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        let mut changed = self.rows.len() != before;
        for row in &mut self.rows {
            if row.original_post.as_ref().is_some_and(|s| s.id == id) {
                row.original_post = None;
                changed = true;
            }
        }
        changed
    }

    /// Inserted reposts/quotes usually arrive without the join; fill the
    /// snapshot from the collection when the target is already loaded.
    fn embed_local_snapshot(&self, row: &mut ActivityRow) {
        if row.original_post.is_some() {
            return;
        }
        let Some(target) = row.target_id() else {
            return;
        };
        if let Some(original) = self.rows.iter().find(|r| r.id == target) {
            row.original_post = Some(Box::new(original.clone()));
        }
    }
}
