// Composition tests — verifying that the feed stages chain together correctly.
//
// These tests exercise the data flow between modules:
//   JSON rows -> Audience -> Backfill -> Aggregate -> Attribution
// plus the cache and real-time paths feeding the same aggregation, without
// any network calls (the cache is in-memory SQLite).

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use unifeed::db::sqlite::SqliteDatabase;
use unifeed::db::Database;
use unifeed::feed::attribution::attribution_line;
use unifeed::feed::audience::Audience;
use unifeed::feed::live::{events_from_jsonl, LiveFeed};
use unifeed::feed::row::rows_from_str;
use unifeed::feed::{aggregate, ActivityRow};
use unifeed::output::{format_age, truncate_chars};
use unifeed::source::backfill::fill_from_batch;

/// A small campus feed as the backend returns it: counts in mixed shapes,
/// one repost with its join, one without, a quote, and a broken row.
const FEED_JSON: &str = r#"[
  {
    "id": "r2",
    "author_id": "u3",
    "author": { "id": "u3", "full_name": "Caio Souza" },
    "original_post_id": "p1",
    "created_at": "2024-05-01T12:00:00Z"
  },
  {
    "id": "q1",
    "author_id": "u2",
    "author": { "id": "u2", "username": "beto" },
    "content": "Worth reading before Friday",
    "original_post_id": "p1",
    "original_post": { "id": "p1", "author_id": "dept", "content": "Library hours change" },
    "created_at": "2024-05-01T11:30:00Z",
    "likes": [{ "count": 2 }]
  },
  {
    "id": "r1",
    "author_id": "u2",
    "author": { "id": "u2", "username": "beto" },
    "original_post_id": "p1",
    "original_post": {
      "id": "p1",
      "author_id": "dept",
      "content": "Library hours change",
      "likes": 3
    },
    "created_at": "2024-05-01T11:00:00Z"
  },
  {
    "id": "p2",
    "author_id": "u4",
    "content": "Anyone selling a calculus textbook?",
    "created_at": "2024-05-01T10:30:00Z",
    "comments": { "count": 4 }
  },
  {
    "id": "p1",
    "author_id": "dept",
    "author": { "id": "dept", "full_name": "University Library", "is_official": true },
    "content": "Library hours change",
    "audience_tag": "announcement",
    "created_at": "2024-05-01T09:00:00Z",
    "likes": 5
  },
  { "id": 17, "content": ["not", "a", "row"] }
]"#;

fn feed_rows() -> Vec<ActivityRow> {
    rows_from_str(FEED_JSON).unwrap()
}

// ============================================================
// Chain: JSON -> Backfill -> Aggregate -> Attribution
// ============================================================

#[test]
fn everyone_feed_collapses_reposts_and_keeps_quote() {
    let mut rows = feed_rows();
    assert_eq!(rows.len(), 5, "the broken row should be skipped");

    fill_from_batch(&mut rows);
    let entries = aggregate(&rows);

    let ids: Vec<&str> = entries.iter().map(|e| e.main.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "q1", "p2"]);

    let library = &entries[0];
    assert_eq!(library.main.likes, 5, "the original row's counts win over snapshots");
    assert_eq!(
        attribution_line(library, None).as_deref(),
        Some("Caio Souza and 1 other shared this")
    );
    assert_eq!(
        attribution_line(library, Some("u3")).as_deref(),
        Some("You and 1 other shared this")
    );

    let quote = &entries[1];
    assert!(!quote.is_repost_group);
    assert_eq!(quote.main.likes, 2);
    assert_eq!(quote.main.original_post.as_ref().map(|p| p.id.as_str()), Some("p1"));

    assert_eq!(entries[2].main.comments, 4);
}

#[test]
fn official_feed_shows_announcement_without_reposts() {
    let rows = Audience::Official.filter(feed_rows());
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].main.id, "p1");
    assert!(!entries[0].is_repost_group);
}

#[test]
fn following_feed_keeps_followed_reposts_of_unfollowed_posts() {
    let audience = Audience::Following {
        viewer_id: "u3".to_string(),
        followed: HashSet::from(["u2".to_string()]),
    };
    let mut rows = audience.filter(feed_rows());
    fill_from_batch(&mut rows);
    let entries = aggregate(&rows);

    let ids: Vec<&str> = entries.iter().map(|e| e.main.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "q1"]);
    let reposters: Vec<&str> = entries[0].reposters.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(reposters, vec!["u3", "u2"]);
}

#[test]
fn without_backfill_bare_repost_still_merges_by_target() {
    let entries = aggregate(&feed_rows());
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].main.id, "p1");
    assert!(!entries[0].is_stub());
}

// ============================================================
// Chain: Cache -> Aggregate
// ============================================================

#[tokio::test]
async fn cached_rows_aggregate_like_fresh_rows() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    unifeed::db::schema::create_tables(&conn).unwrap();
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::new(conn));

    let rows = feed_rows();
    db.upsert_rows(&rows).await.unwrap();
    let cached = db.get_recent_rows(100).await.unwrap();

    assert_eq!(cached.len(), rows.len());
    assert_eq!(aggregate(&cached), aggregate(&rows));
}

// ============================================================
// Chain: Real-time events -> LiveFeed -> Aggregate
// ============================================================

#[test]
fn replayed_events_match_a_refetch() {
    let mut live = LiveFeed::new();
    let ticket = live.begin_fetch();
    live.complete_fetch(ticket, feed_rows());

    let stream = events_from_jsonl(
        r#"{"event_type":"INSERT","table":"likes","new":{"post_id":"p1","user_id":"u9"}}
{"event_type":"DELETE","table":"posts","old":{"id":"q1"}}
{"event_type":"INSERT","table":"posts","new":{"id":"r3","author_id":"u9","original_post_id":"p2","created_at":"2024-05-01T13:00:00Z"}}"#,
    );
    for event in stream {
        live.apply(event);
    }

    let entries = live.entries();
    let ids: Vec<&str> = entries.iter().map(|e| e.main.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
    assert_eq!(entries[0].reposters[0].id, "u9");
    assert_eq!(entries[1].main.likes, 6);
}

// ============================================================
// Rendering helpers
// ============================================================

#[test]
fn age_and_truncation_for_cards() {
    let rows = feed_rows();
    let now = rows[0].created_at.unwrap() + chrono::Duration::minutes(90);

    assert_eq!(format_age(rows[0].created_at, now), "1h");
    assert_eq!(format_age(None, now), "unknown time");

    let long = "é".repeat(300);
    let cut = truncate_chars(&long, 280);
    assert_eq!(cut.chars().count(), 283);
    assert!(cut.ends_with("..."));
}
