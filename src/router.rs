//! Action router: decides whether a classified note fires a calendar
//! side effect, and with what derived parameters. Pure decision function;
//! the actual calendar call lives in [`crate::calendar`].

use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;

use crate::record::{ClassificationRecord, TimeBucket};

/// Derived events get a fixed half-hour duration.
pub const EVENT_DURATION_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEventRequest {
    pub summary: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Fires iff the record is a task or event carrying a concrete timestamp.
/// Categorical buckets never fire.
pub fn route(note_text: &str, record: &ClassificationRecord) -> Option<CalendarEventRequest> {
    if !record.item_type.allows_timestamp() {
        return None;
    }
    let TimeBucket::At(start) = record.time_bucket else {
        return None;
    };

    Some(CalendarEventRequest {
        summary: note_text.to_string(),
        description: format!("category: {}", record.category),
        start,
        end: start + Duration::minutes(EVENT_DURATION_MINUTES),
    })
}
