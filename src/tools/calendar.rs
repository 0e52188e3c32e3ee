//! Calendar-creation tool exposed to the conversational assistant.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime};
use serde_json::{json, Value};

use super::{Tool, ToolOutput};
use crate::calendar::CalendarClient;
use crate::router::{CalendarEventRequest, EVENT_DURATION_MINUTES};

/// When the model gives a date but no time, schedule mid-morning.
const DEFAULT_EVENT_TIME: (u32, u32) = (9, 0);

pub struct CreateCalendarEventTool {
    calendar: Arc<dyn CalendarClient>,
    offset: FixedOffset,
}

impl CreateCalendarEventTool {
    /// `offset` localizes the model's naive date/time arguments.
    pub fn new(calendar: Arc<dyn CalendarClient>, offset: FixedOffset) -> Self {
        Self { calendar, offset }
    }
}

#[async_trait]
impl Tool for CreateCalendarEventTool {
    fn name(&self) -> &str {
        "create_calendar_event"
    }

    fn description(&self) -> &str {
        "Create a 30-minute calendar event on the user's calendar."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Short event title"
                },
                "date": {
                    "type": "string",
                    "description": "Event date as YYYY-MM-DD"
                },
                "time": {
                    "type": "string",
                    "description": "Optional start time as HH:MM (24h); defaults to 09:00"
                }
            },
            "required": ["title", "date"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let title = match params.get("title").and_then(Value::as_str).map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Ok(ToolOutput::Error(
                    "Missing required 'title' parameter".to_string(),
                ));
            }
        };

        let date = match params.get("date").and_then(Value::as_str).map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Ok(ToolOutput::Error(
                    "Missing required 'date' parameter".to_string(),
                ));
            }
        };
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            return Ok(ToolOutput::Error(format!(
                "Invalid 'date' parameter '{}', expected YYYY-MM-DD",
                date
            )));
        };

        let time = match params.get("time").and_then(Value::as_str).map(str::trim) {
            Some(v) if !v.is_empty() => match NaiveTime::parse_from_str(v, "%H:%M") {
                Ok(t) => t,
                Err(_) => {
                    return Ok(ToolOutput::Error(format!(
                        "Invalid 'time' parameter '{}', expected HH:MM",
                        v
                    )));
                }
            },
            _ => NaiveTime::from_hms_opt(DEFAULT_EVENT_TIME.0, DEFAULT_EVENT_TIME.1, 0)
                .unwrap_or_default(),
        };

        let Some(start) = date.and_time(time).and_local_timezone(self.offset).single() else {
            return Ok(ToolOutput::Error(
                "Date and time do not form a valid instant".to_string(),
            ));
        };

        let request = CalendarEventRequest {
            summary: title.to_string(),
            description: "created from chat".to_string(),
            start,
            end: start + Duration::minutes(EVENT_DURATION_MINUTES),
        };

        let link = self.calendar.create_event(&request).await?;
        Ok(ToolOutput::Json(json!({
            "title": title,
            "start": start.to_rfc3339(),
            "link": link,
        })))
    }
}
