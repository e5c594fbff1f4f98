// Output formatting — terminal display of the aggregated feed.

pub mod terminal;

use chrono::{DateTime, Utc};

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing (`&text[..120]`), this respects UTF-8 character boundaries
/// and will never panic on multi-byte characters like emoji or accented letters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Short relative age ("just now", "5m", "3h", "2d"); dates past a week.
pub fn format_age(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = created_at else {
        return "unknown time".to_string();
    };
    let secs = (now - ts).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s if s < 7 * 86_400 => format!("{}d", s / 86_400),
        _ => ts.format("%Y-%m-%d").to_string(),
    }
}
