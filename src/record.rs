//! Typed classification records.
//!
//! The completion backend hands us loosely formatted strings; everything here
//! is decided once, at decode time, so downstream consumers (action routing,
//! the store, sorting in clients) never re-inspect raw text.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};

/// Closed category vocabulary. `none` is the catch-all for notes that fit
/// nowhere (or a decoded-but-missing category); `parse_error` marks records
/// whose classification response was entirely undecodable.
pub const CATEGORIES: &[&str] = &[
    "personal",
    "work",
    "creative",
    "health",
    "money",
    "food",
    "home",
    "travel",
    "learning",
    "admin",
    "wishlist",
    "social",
    "none",
    "parse_error",
];

pub const DEFAULT_CATEGORY: &str = "none";
pub const PARSE_ERROR_CATEGORY: &str = "parse_error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Task,
    Event,
    Idea,
    Education,
    ImportantInfo,
}

impl ItemType {
    /// Parse a wire value. Anything unrecognized degrades to `Idea` — the
    /// record must always carry a member of the closed set.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "task" => ItemType::Task,
            "event" => ItemType::Event,
            "idea" => ItemType::Idea,
            "education" => ItemType::Education,
            "important_info" => ItemType::ImportantInfo,
            _ => ItemType::Idea,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Task => "task",
            ItemType::Event => "event",
            ItemType::Idea => "idea",
            ItemType::Education => "education",
            ItemType::ImportantInfo => "important_info",
        }
    }

    /// Only tasks and events may carry a concrete timestamp.
    pub fn allows_timestamp(&self) -> bool {
        matches!(self, ItemType::Task | ItemType::Event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Today,
    ThisWeek,
    Upcoming,
    None,
}

impl BucketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketKind::Today => "today",
            BucketKind::ThisWeek => "this_week",
            BucketKind::Upcoming => "upcoming",
            BucketKind::None => "none",
        }
    }
}

/// Either a coarse categorical timing hint or a concrete point in time.
///
/// The variant is fixed here and never re-derived from strings downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeBucket {
    Bucket(BucketKind),
    At(DateTime<FixedOffset>),
}

impl TimeBucket {
    pub fn none() -> Self {
        TimeBucket::Bucket(BucketKind::None)
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, TimeBucket::At(_))
    }

    /// Decide the variant from a wire string.
    ///
    /// Bucket keywords win first. A value carrying a date separator is parsed
    /// as a timestamp: RFC 3339, then a naive datetime, then a bare date at
    /// midnight, the naive forms localized with `offset`. Anything else
    /// degrades to `none`.
    pub fn parse(raw: &str, offset: FixedOffset) -> Self {
        let value = raw.trim();
        match value.to_ascii_lowercase().as_str() {
            "today" => return TimeBucket::Bucket(BucketKind::Today),
            "this_week" => return TimeBucket::Bucket(BucketKind::ThisWeek),
            "upcoming" => return TimeBucket::Bucket(BucketKind::Upcoming),
            "" | "none" | "null" => return TimeBucket::none(),
            _ => {}
        }

        if !value.contains('-') && !value.contains('/') {
            return TimeBucket::none();
        }

        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return TimeBucket::At(ts);
        }

        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                if let Some(ts) = naive.and_local_timezone(offset).single() {
                    return TimeBucket::At(ts);
                }
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                if let Some(ts) = midnight.and_local_timezone(offset).single() {
                    return TimeBucket::At(ts);
                }
            }
        }

        tracing::debug!("Unparseable time_bucket '{}', defaulting to none", value);
        TimeBucket::none()
    }

    pub fn to_wire(&self) -> String {
        match self {
            TimeBucket::Bucket(kind) => kind.as_str().to_string(),
            TimeBucket::At(ts) => ts.to_rfc3339(),
        }
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

/// Normalize a category against the closed vocabulary. Missing or unknown
/// values become `none`; the field is never empty.
pub fn normalize_category(raw: Option<&str>) -> String {
    let Some(value) = raw else {
        return DEFAULT_CATEGORY.to_string();
    };
    let lowered = value.trim().to_ascii_lowercase();
    if CATEGORIES.contains(&lowered.as_str()) {
        lowered
    } else {
        DEFAULT_CATEGORY.to_string()
    }
}

/// Structured result of classifying one note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    pub item_type: ItemType,
    pub time_bucket: TimeBucket,
    pub category: String,
}

impl ClassificationRecord {
    /// Safe default when the completion response is entirely undecodable.
    /// Classification must never block note ingestion.
    pub fn parse_failure() -> Self {
        Self {
            item_type: ItemType::Idea,
            time_bucket: TimeBucket::none(),
            category: PARSE_ERROR_CATEGORY.to_string(),
        }
    }
}

/// One row of the append-only note store:
/// (text, created_at, received_at, item_type, time_bucket, category).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub text: String,
    pub created_at: Option<String>,
    pub received_at: String,
    pub item_type: String,
    pub time_bucket: String,
    pub category: String,
}
