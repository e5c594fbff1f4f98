// Attribution header for repost groups ("Ana shared this").

use super::aggregate::DisplayEntry;
use super::row::Author;

/// Build the attribution header for an entry, or `None` when the entry is
/// not a repost group (or nobody attributable reposted it).
///
/// When `viewer_id` matches the most recent reposter the header reads "You".
pub fn attribution_line(entry: &DisplayEntry, viewer_id: Option<&str>) -> Option<String> {
    if !entry.is_repost_group {
        return None;
    }
    let first = entry.reposters.first()?;
    let name = reposter_name(first, viewer_id);

    Some(match entry.reposters.len() - 1 {
        0 => format!("{name} shared this"),
        1 => format!("{name} and 1 other shared this"),
        others => format!("{name} and {others} others shared this"),
    })
}

fn reposter_name(author: &Author, viewer_id: Option<&str>) -> String {
    match viewer_id {
        Some(viewer) if !viewer.is_empty() && viewer == author.id => "You".to_string(),
        _ => author.display_name(),
    }
}
