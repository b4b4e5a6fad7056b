//! The persistence unit shared by every layer that writes through
//! `confluence-persistence` (§3 "Record").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Category a [`Record`] is filed under. Determines the on-disk directory
/// (`base/<category>/<date>/...`) and the index partition.
///
/// Open set by design: callers may file under any category name, but the
/// well-known ones used by the platform itself are named here so crates
/// don't repeat string literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordCategory(pub String);

impl RecordCategory {
    pub const SIGNALS: &'static str = "signals";
    pub const PATTERNS: &'static str = "patterns";
    pub const RECOVERY: &'static str = "recovery";
    pub const HEALTH: &'static str = "health";
    pub const EMERGENCY: &'static str = "emergency";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordCategory {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A durable, categorized, self-describing unit of storage (§3).
///
/// `id` is unique within `category` (upsert semantics on conflict);
/// `timestamp` is expected to be monotonic per writer, though the
/// persistence layer does not itself enforce that across writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub category: RecordCategory,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub metadata: HashMap<String, String>,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<RecordCategory>,
        timestamp: DateTime<Utc>,
        payload: Value,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            timestamp,
            payload,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}
