use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// The closed set of content kinds a worker can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Book,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Movie, ContentType::Book];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Book => "book",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "book" => Ok(ContentType::Book),
            other => Err(UnknownContentType(other.to_string())),
        }
    }
}

/// Value of the `type` query parameter of a find request.
///
/// Every kind is recognised; only [`FindKind::ByName`] is answered by workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindKind {
    ByName,
    ByYear,
    ByIsbn,
    ByActor,
    ByWriter,
    ByPeriod,
}

impl FindKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "byName" => Some(FindKind::ByName),
            "byYear" => Some(FindKind::ByYear),
            "byISBN" => Some(FindKind::ByIsbn),
            "byActor" => Some(FindKind::ByActor),
            "byWriter" => Some(FindKind::ByWriter),
            "byPeriod" => Some(FindKind::ByPeriod),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindKind::ByName => "byName",
            FindKind::ByYear => "byYear",
            FindKind::ByIsbn => "byISBN",
            FindKind::ByActor => "byActor",
            FindKind::ByWriter => "byWriter",
            FindKind::ByPeriod => "byPeriod",
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, FindKind::ByName)
    }
}

/// A single answer item produced by a worker.
///
/// Workers fill the descriptive fields; `id`, `created`, `edited` are stamped
/// by the aggregator when the item is persisted, and `stars`/`comment` are
/// set by the user once the item is saved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentUnit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub stars: i32,
    #[serde(default)]
    pub comment: String,
    /// Timestamp (ms) of the last edit.
    #[serde(default)]
    pub edited: u64,
    /// Timestamp (ms) when the item was persisted.
    #[serde(default)]
    pub created: u64,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pic_url: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: String,
}

/// Everything one worker answered for one query, in the worker's order.
pub type ContentResponse = Vec<ContentUnit>;

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
