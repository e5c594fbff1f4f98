// Counter normalization — one integer shape for likes/comments/shares.
//
// The backend returns engagement counts in whatever shape the query path
// produced: a bare number, an aggregate join (`[{"count": 5}]`), or a single
// count object (`{"count": 5}`). Everything downstream sees a plain u64.

use serde::{Deserialize, Deserializer};

/// A single `{"count": n}` object as produced by aggregate joins.
#[derive(Debug, Clone, Deserialize)]
pub struct CountObject {
    #[serde(default)]
    pub count: Option<RawCount>,
}

/// Every upstream shape a counter can arrive in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCount {
    Number(i64),
    Float(f64),
    Text(String),
    List(Vec<CountObject>),
    Object(Box<CountObject>),
}

impl RawCount {
    /// Resolve to a plain count. Negative or unparseable values become 0,
    /// and an empty aggregate list means nobody has engaged yet.
    pub fn resolve(&self) -> u64 {
        match self {
            RawCount::Number(n) => (*n).max(0) as u64,
            RawCount::Float(f) if f.is_finite() && *f > 0.0 => *f as u64,
            RawCount::Float(_) => 0,
            RawCount::Text(s) => s.trim().parse::<i64>().map(|n| n.max(0) as u64).unwrap_or(0),
            RawCount::List(items) => items.first().map(CountObject::resolve).unwrap_or(0),
            RawCount::Object(obj) => obj.resolve(),
        }
    }
}

impl CountObject {
    fn resolve(&self) -> u64 {
        self.count.as_ref().map(RawCount::resolve).unwrap_or(0)
    }
}

/// Resolve an optional raw counter (absent or null counts as 0).
pub fn resolve_count(raw: Option<&RawCount>) -> u64 {
    raw.map(RawCount::resolve).unwrap_or(0)
}

/// Serde adapter: `#[serde(deserialize_with = "deserialize_count")]` turns any
/// counter shape into a u64 at ingestion time.
pub fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    // Go through serde_json::Value so a shape we don't recognise becomes 0
    // instead of failing the whole row.
    let value = serde_json::Value::deserialize(deserializer)?;
    let raw: Option<RawCount> = serde_json::from_value(value).ok();
    Ok(resolve_count(raw.as_ref()))
}
