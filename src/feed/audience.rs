// Audience filters — which rows a given feed tab shows.
//
// The hosted backend can filter server-side, but cached and file-backed rows
// need the same filtering client-side, so it lives here.

use std::collections::HashSet;

use super::row::ActivityRow;

/// Audience tag institutional tools set on announcements.
pub const ANNOUNCEMENT_TAG: &str = "announcement";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every row, unfiltered.
    Everyone,
    /// The viewer's own rows plus rows by accounts they follow.
    Following {
        viewer_id: String,
        followed: HashSet<String>,
    },
    /// Official accounts and announcement-tagged rows only.
    Official,
}

impl Audience {
    /// Whether a row belongs in this audience's feed.
    pub fn admits(&self, row: &ActivityRow) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Following {
                viewer_id,
                followed,
            } => {
                let author = row.author_identity();
                author == viewer_id || followed.contains(author)
            }
            Audience::Official => {
                row.author.as_ref().is_some_and(|a| a.is_official)
                    || row
                        .audience_tag
                        .as_deref()
                        .is_some_and(|tag| tag.trim().eq_ignore_ascii_case(ANNOUNCEMENT_TAG))
            }
        }
    }

    /// Keep admitted rows, preserving input order.
    pub fn filter(&self, rows: Vec<ActivityRow>) -> Vec<ActivityRow> {
        rows.into_iter().filter(|row| self.admits(row)).collect()
    }
}
