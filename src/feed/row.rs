// Activity rows — the unit the data source hands us.
//
// A row is an original post, a repost marker (a content-free row pointing at
// another post), or a quote (a row with its own commentary pointing at another
// post). The backend never tags which one a row is, so `RowKind` is derived
// from field presence once, here, and everything else matches on the tag.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::count::deserialize_count;

/// The account that produced a row, as embedded by the profile join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "fullName", alias = "display_name")]
    pub full_name: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    pub avatar_url: Option<String>,
    /// Institutional accounts (departments, clubs, the university itself).
    #[serde(default, alias = "isOfficial")]
    pub is_official: bool,
}

impl Author {
    /// A bare author known only by id (no profile join available).
    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Best human-readable name: full name, then @username, then the raw id.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        if let Some(username) = self.username.as_deref().map(str::trim) {
            if !username.is_empty() {
                return format!("@{username}");
            }
        }
        self.id.clone()
    }
}

/// What a row represents. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Original,
    Repost,
    Quote,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Original => "original",
            RowKind::Repost => "repost",
            RowKind::Quote => "quote",
        }
    }
}

impl std::fmt::Display for RowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted record relevant to a feed.
///
/// Field names follow the backend's snake_case columns; the camelCase names
/// used by the web client are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRow {
    #[serde(default)]
    pub id: String,
    #[serde(
        default,
        alias = "createdAt",
        deserialize_with = "deserialize_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "authorId", alias = "user_id")]
    pub author_id: String,
    #[serde(
        default,
        alias = "profile",
        alias = "profiles",
        deserialize_with = "deserialize_embedded"
    )]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "originalPostId")]
    pub original_post_id: Option<String>,
    /// Snapshot of the referenced post. May be missing even when
    /// `original_post_id` is set (deleted target, join not requested).
    #[serde(
        default,
        alias = "originalPost",
        deserialize_with = "deserialize_embedded"
    )]
    pub original_post: Option<Box<ActivityRow>>,
    #[serde(default, alias = "isQuote")]
    pub is_quote: Option<bool>,
    /// Free-form audience marker set by institutional posting tools
    /// (e.g. "announcement").
    #[serde(default, alias = "audienceTag")]
    pub audience_tag: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub likes: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub comments: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub shares: u64,
}

impl ActivityRow {
    /// Trimmed body text ("" for pure reposts).
    pub fn text(&self) -> &str {
        self.content.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn has_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// The referenced post id, if this row points at another post.
    pub fn target_id(&self) -> Option<&str> {
        self.original_post_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn kind(&self) -> RowKind {
        classify(self)
    }

    /// The identity this row contributes to during aggregation.
    ///
    /// Quotes and originals are keyed by their own id; reposts by their target
    /// (snapshot id first, then the foreign key). `None` means the row cannot
    /// be attributed to anything and gets skipped.
    pub fn canonical_id(&self) -> Option<&str> {
        match self.kind() {
            RowKind::Original | RowKind::Quote => non_empty(&self.id),
            RowKind::Repost => self
                .original_post
                .as_deref()
                .and_then(|snapshot| non_empty(&snapshot.id))
                .or_else(|| self.target_id()),
        }
    }

    /// Identity used to deduplicate reposters: the author column, falling back
    /// to the embedded profile's id.
    pub fn author_identity(&self) -> &str {
        match non_empty(&self.author_id) {
            Some(id) => id,
            None => self.author.as_ref().map(|a| a.id.as_str()).unwrap_or(""),
        }
    }

    /// The author as a reposter entry: embedded profile when present,
    /// otherwise a bare id.
    pub fn reposter(&self) -> Author {
        let identity = self.author_identity();
        match &self.author {
            Some(profile) => Author {
                id: identity.to_string(),
                ..profile.clone()
            },
            None => Author::with_id(identity),
        }
    }

    /// Shallow overlay of a fresher copy of the same post.
    ///
    /// Scalar columns come from `fresh`. Embedded joins (author profile,
    /// original snapshot) are kept when `fresh` was fetched without them.
    pub fn overlay(&mut self, fresh: &ActivityRow) {
        if non_empty(&fresh.id).is_some() {
            self.id = fresh.id.clone();
        }
        if fresh.created_at.is_some() {
            self.created_at = fresh.created_at;
        }
        if non_empty(&fresh.author_id).is_some() {
            self.author_id = fresh.author_id.clone();
        }
        if fresh.author.is_some() {
            self.author = fresh.author.clone();
        } else {
            // Drop a profile that belongs to someone else (a stub's reposter).
            let identity = fresh.author_identity();
            if !identity.is_empty() && self.author.as_ref().is_some_and(|a| a.id != identity) {
                self.author = None;
            }
        }
        self.content = fresh.content.clone();
        self.image_url = fresh.image_url.clone();
        self.original_post_id = fresh.original_post_id.clone();
        self.is_quote = fresh.is_quote;
        self.audience_tag = fresh.audience_tag.clone();
        if fresh.original_post.is_some() || fresh.original_post_id.is_none() {
            self.original_post = fresh.original_post.clone();
        }
        self.likes = fresh.likes;
        self.comments = fresh.comments;
        self.shares = fresh.shares;
    }
}

/// Classify a row from its fields.
///
/// A row pointing at another post is a quote when it carries its own content,
/// an image, or an explicit quote flag; otherwise it is a repost.
pub fn classify(row: &ActivityRow) -> RowKind {
    if row.target_id().is_none() {
        return RowKind::Original;
    }
    if !row.text().is_empty() || row.has_image() || row.is_quote == Some(true) {
        RowKind::Quote
    } else {
        RowKind::Repost
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Parse a JSON array of rows, skipping elements that don't parse.
///
/// A non-array value yields no rows. One malformed row never blanks the feed.
pub fn rows_from_json(value: Value) -> Vec<ActivityRow> {
    let Value::Array(items) = value else {
        warn!("Expected a JSON array of activity rows");
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<ActivityRow>(item) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(index, error = %e, "Skipping unparseable activity row");
                None
            }
        })
        .collect()
}

/// Parse rows from JSON text. Fails only if the text is not JSON at all.
pub fn rows_from_str(json: &str) -> anyhow::Result<Vec<ActivityRow>> {
    let value: Value = serde_json::from_str(json)?;
    Ok(rows_from_json(value))
}

/// Accept an embedded join as an object, an array of one object, or null.
/// Anything that doesn't parse is treated as absent.
fn deserialize_embedded<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .next()
            .and_then(|item| serde_json::from_value(item).ok()),
        Some(item @ Value::Object(_)) => serde_json::from_value(item).ok(),
        _ => None,
    })
}

/// RFC 3339 first, then the zone-less formats the backend emits for
/// `timestamp without time zone` columns (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => parse_timestamp(&raw),
        _ => None,
    })
}

/// Parse a timestamp string leniently. Returns `None` if no format matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
