// Unit tests for feed aggregation and repost attribution.
//
// Covers the merge rules end to end on hand-built rows: reposts collapse
// into one entry per original, reposters are deduplicated and ordered most
// recent first, quotes stand alone, and entries keep the position of their
// newest activity.

use serde_json::{json, Value};
use unifeed::feed::attribution::attribution_line;
use unifeed::feed::{aggregate, ActivityRow, DisplayEntry};

fn ts(minute: u32) -> String {
    format!("2024-05-01T10:{minute:02}:00Z")
}

fn row(value: Value) -> ActivityRow {
    serde_json::from_value(value).unwrap()
}

fn original(id: &str, author: &str, minute: u32) -> ActivityRow {
    row(json!({
        "id": id,
        "author_id": author,
        "content": format!("post {id}"),
        "created_at": ts(minute),
    }))
}

fn repost(id: &str, reposter: &str, target: &ActivityRow, minute: u32) -> ActivityRow {
    row(json!({
        "id": id,
        "author_id": reposter,
        "author": { "id": reposter, "full_name": format!("User {reposter}") },
        "original_post_id": target.id,
        "original_post": serde_json::to_value(target).unwrap(),
        "created_at": ts(minute),
    }))
}

fn quote(id: &str, author: &str, target: &ActivityRow, minute: u32) -> ActivityRow {
    row(json!({
        "id": id,
        "author_id": author,
        "content": "my take",
        "original_post_id": target.id,
        "original_post": serde_json::to_value(target).unwrap(),
        "created_at": ts(minute),
    }))
}

fn reposter_ids(entry: &DisplayEntry) -> Vec<&str> {
    entry.reposters.iter().map(|a| a.id.as_str()).collect()
}

fn main_ids(entries: &[DisplayEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.main.id.as_str()).collect()
}

// ============================================================
// Basic shapes
// ============================================================

#[test]
fn empty_input_gives_empty_feed() {
    assert!(aggregate(&[]).is_empty());
}

#[test]
fn plain_originals_pass_through_newest_first() {
    let rows = vec![original("p1", "a", 1), original("p2", "b", 2)];
    let entries = aggregate(&rows);

    assert_eq!(main_ids(&entries), vec!["p2", "p1"]);
    assert!(entries.iter().all(|e| !e.is_repost_group && e.reposters.is_empty()));
}

// Original plus one repost: a single entry showing the original, attributed
// to the reposter.
#[test]
fn repost_merges_into_original() {
    let p1 = original("p1", "a", 0);
    let rows = vec![repost("r1", "b", &p1, 5), p1.clone()];
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].main.id, "p1");
    assert!(entries[0].is_repost_group);
    assert_eq!(reposter_ids(&entries[0]), vec!["b"]);
    assert_eq!(
        attribution_line(&entries[0], None).as_deref(),
        Some("User b shared this")
    );
}

// Two reposts of a post that is not itself in the batch: the snapshot
// carries the entry and the later reposter is listed first.
#[test]
fn two_reposts_of_absent_original() {
    let p1 = original("p1", "a", 0);
    let rows = vec![repost("r1", "b", &p1, 1), repost("r2", "c", &p1, 2)];
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].main.id, "p1");
    assert_eq!(entries[0].main.text(), "post p1");
    assert_eq!(reposter_ids(&entries[0]), vec!["c", "b"]);
    assert_eq!(
        attribution_line(&entries[0], None).as_deref(),
        Some("User c and 1 other shared this")
    );
}

#[test]
fn same_reposter_twice_is_listed_once() {
    let p1 = original("p1", "a", 0);
    let rows = vec![
        repost("r1", "b", &p1, 1),
        repost("r2", "b", &p1, 3),
        repost("r3", "c", &p1, 2),
    ];
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert_eq!(reposter_ids(&entries[0]), vec!["b", "c"]);
}

// A quote of a post never merges with it, and a repost of the quoted post
// still merges into the original.
#[test]
fn quote_stands_alone_next_to_its_original() {
    let p1 = original("p1", "a", 0);
    let rows = vec![
        p1.clone(),
        quote("q1", "b", &p1, 2),
        repost("r1", "c", &p1, 1),
    ];
    let entries = aggregate(&rows);

    assert_eq!(main_ids(&entries), vec!["q1", "p1"]);
    assert!(!entries[0].is_repost_group);
    assert_eq!(entries[0].main.original_post.as_ref().map(|p| p.id.as_str()), Some("p1"));
    assert_eq!(reposter_ids(&entries[1]), vec!["c"]);
}

#[test]
fn quotes_of_the_same_post_never_merge() {
    let p1 = original("p1", "a", 0);
    let rows = vec![quote("q1", "b", &p1, 1), quote("q2", "b", &p1, 2)];
    let entries = aggregate(&rows);

    assert_eq!(main_ids(&entries), vec!["q2", "q1"]);
}

// ============================================================
// Ordering
// ============================================================

// An old post reposted recently floats to the repost's position.
#[test]
fn repost_floats_old_post_to_repost_position() {
    let p1 = original("p1", "a", 0);
    let p2 = original("p2", "b", 10);
    let rows = vec![p1.clone(), p2, repost("r1", "c", &p1, 20)];
    let entries = aggregate(&rows);

    assert_eq!(main_ids(&entries), vec!["p1", "p2"]);
    assert!(entries[0].is_repost_group);
    assert!(!entries[1].is_repost_group);
}

#[test]
fn input_order_does_not_matter() {
    let p1 = original("p1", "a", 0);
    let p2 = original("p2", "b", 10);
    let forward = vec![p1.clone(), p2.clone(), repost("r1", "c", &p1, 20)];
    let mut backward = forward.clone();
    backward.reverse();

    assert_eq!(aggregate(&forward), aggregate(&backward));
}

#[test]
fn equal_timestamps_keep_input_order() {
    let rows = vec![original("p1", "a", 5), original("p2", "b", 5)];
    assert_eq!(main_ids(&aggregate(&rows)), vec!["p1", "p2"]);
}

#[test]
fn rows_without_timestamp_sort_last() {
    let undated = row(json!({ "id": "p0", "author_id": "a", "content": "undated" }));
    let rows = vec![undated, original("p1", "a", 1)];
    assert_eq!(main_ids(&aggregate(&rows)), vec!["p1", "p0"]);
}

// ============================================================
// Snapshot freshness and stubs
// ============================================================

#[test]
fn original_row_refreshes_stale_snapshot() {
    let mut snapshot = original("p1", "a", 0);
    snapshot.likes = 1;
    let mut current = snapshot.clone();
    current.likes = 10;
    current.content = Some("edited".to_string());

    let rows = vec![repost("r1", "b", &snapshot, 5), current];
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].main.likes, 10);
    assert_eq!(entries[0].main.text(), "edited");
    assert_eq!(reposter_ids(&entries[0]), vec!["b"]);
}

#[test]
fn repost_without_snapshot_is_a_stub() {
    let rows = vec![row(json!({
        "id": "r1",
        "author_id": "b",
        "original_post_id": "gone",
        "created_at": ts(1),
    }))];
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_stub());
    assert!(entries[0].is_repost_group);
    assert_eq!(reposter_ids(&entries[0]), vec!["b"]);
}

#[test]
fn stub_resolves_when_original_is_in_batch() {
    let p1 = original("p1", "a", 0);
    let bare = row(json!({
        "id": "r1",
        "author_id": "b",
        "original_post_id": "p1",
        "created_at": ts(1),
    }));
    let entries = aggregate(&[bare, p1]);

    assert_eq!(entries.len(), 1);
    assert!(!entries[0].is_stub());
    assert_eq!(entries[0].main.id, "p1");
    assert_eq!(entries[0].main.text(), "post p1");
}

#[test]
fn resolved_stub_drops_reposter_profile() {
    let bare = row(json!({
        "id": "r1",
        "author_id": "b",
        "author": { "id": "b", "full_name": "Bob Reposter" },
        "original_post_id": "p1",
        "created_at": ts(1),
    }));
    let entries = aggregate(&[bare, original("p1", "a", 0)]);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].main.id, "p1");
    assert_eq!(entries[0].main.author_id, "a");
    assert_eq!(entries[0].main.author, None);
    assert_eq!(entries[0].reposters[0].display_name(), "Bob Reposter");
}

#[test]
fn stub_adopts_snapshot_from_later_repost() {
    let p1 = original("p1", "a", 0);
    let bare = row(json!({
        "id": "r2",
        "author_id": "c",
        "original_post_id": "p1",
        "created_at": ts(5),
    }));
    let entries = aggregate(&[bare, repost("r1", "b", &p1, 1)]);

    assert_eq!(entries.len(), 1);
    assert!(!entries[0].is_stub());
    assert_eq!(entries[0].main.id, "p1");
    assert_eq!(reposter_ids(&entries[0]), vec!["c", "b"]);
}

#[test]
fn quote_of_deleted_post_reports_missing() {
    let rows = vec![row(json!({
        "id": "q1",
        "author_id": "b",
        "content": "this aged well",
        "original_post_id": "gone",
        "created_at": ts(1),
    }))];
    let entries = aggregate(&rows);

    assert_eq!(entries.len(), 1);
    assert!(entries[0].quoted_post_missing());
    assert!(!entries[0].is_stub());
}

// ============================================================
// Malformed rows
// ============================================================

#[test]
fn original_without_id_is_skipped() {
    let rows = vec![
        row(json!({ "content": "no id", "created_at": ts(2) })),
        original("p1", "a", 1),
    ];
    assert_eq!(main_ids(&aggregate(&rows)), vec!["p1"]);
}

#[test]
fn repost_without_author_marks_group_but_lists_nobody() {
    let p1 = original("p1", "a", 0);
    let anonymous = row(json!({
        "id": "r1",
        "original_post_id": "p1",
        "original_post": serde_json::to_value(&p1).unwrap(),
        "created_at": ts(1),
    }));
    let entries = aggregate(&[anonymous, p1]);

    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_repost_group);
    assert!(entries[0].reposters.is_empty());
    assert_eq!(attribution_line(&entries[0], None), None);
}

// ============================================================
// Attribution text
// ============================================================

#[test]
fn attribution_counts_others() {
    let p1 = original("p1", "a", 0);
    let rows = vec![
        repost("r1", "b", &p1, 1),
        repost("r2", "c", &p1, 2),
        repost("r3", "d", &p1, 3),
    ];
    let entries = aggregate(&rows);
    assert_eq!(
        attribution_line(&entries[0], None).as_deref(),
        Some("User d and 2 others shared this")
    );
}

#[test]
fn attribution_says_you_for_viewer() {
    let p1 = original("p1", "a", 0);
    let rows = vec![repost("r1", "b", &p1, 1), repost("r2", "me", &p1, 2)];
    let entries = aggregate(&rows);
    assert_eq!(
        attribution_line(&entries[0], Some("me")).as_deref(),
        Some("You and 1 other shared this")
    );
    assert_eq!(
        attribution_line(&entries[0], Some("b")).as_deref(),
        Some("User me and 1 other shared this")
    );
}

#[test]
fn no_attribution_for_plain_posts() {
    let entries = aggregate(&[original("p1", "a", 0)]);
    assert_eq!(attribution_line(&entries[0], Some("a")), None);
}

#[test]
fn entries_serialize_with_camel_case_flags() {
    let p1 = original("p1", "a", 0);
    let entries = aggregate(&[repost("r1", "b", &p1, 1)]);
    let value = serde_json::to_value(&entries).unwrap();

    assert_eq!(value[0]["isRepostGroup"], json!(true));
    assert_eq!(value[0]["main"]["id"], json!("p1"));
    assert_eq!(value[0]["reposters"][0]["id"], json!("b"));
}
