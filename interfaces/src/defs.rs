use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Post,
    Article,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Post => f.write_str("post"),
            SourceKind::Article => f.write_str("article"),
        }
    }
}

/// One fetched unit before classification.
///
/// `identity` is the post id or the article permalink. Two items with the
/// same identity are the same content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub identity: String,
    pub source_kind: SourceKind,
    pub text: String,
    pub author: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub url: String,
    #[serde(default)]
    pub account_category: String,
}

/// Urgency tier. Declaration order is urgency order: P1 sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::P1, Priority::P2, Priority::P3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriority(pub String);

impl fmt::Display for UnknownPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown priority: {}", self.0)
    }
}

impl std::error::Error for UnknownPriority {}

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P1" | "1" => Ok(Priority::P1),
            "P2" | "2" => Ok(Priority::P2),
            "P3" | "3" => Ok(Priority::P3),
            _ => Err(UnknownPriority(s.to_owned())),
        }
    }
}

/// A raw item together with its classification outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    #[serde(flatten)]
    pub item: RawItem,
    pub priority: Priority,
    pub category: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_assets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub analysis: String,
}

/// An account mentioned often enough to be worth adding to the watch-list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub handle: String,
    pub category: String,
    pub mention_count: usize,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub is_current: bool,
}

/// Everything a renderer needs to produce one day's report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub groups: BTreeMap<Priority, Vec<ClassifiedItem>>,
    pub counts: BTreeMap<Priority, usize>,
    pub recommendations: Vec<Recommendation>,
    pub history_index: Vec<HistoryEntry>,
}

impl ReportSnapshot {
    pub fn items(&self, priority: Priority) -> &[ClassifiedItem] {
        self.groups.get(&priority).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, priority: Priority) -> usize {
        self.counts.get(&priority).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

// Object style note:
// Implementations of Renderer are expected to be stateless with respect
// to the snapshot: render the same snapshot twice, get the same document.
// Where the document lands on disk is the caller's business.

pub trait Renderer {
    fn render(&self, snapshot: &ReportSnapshot) -> anyhow::Result<String>;
}

