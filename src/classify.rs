//! Classification engine: one note in, one structurally valid record out.
//!
//! The completion backend is an untrusted text generator. This module's job
//! is to survive prose, partial JSON, and markdown-wrapped JSON while still
//! propagating genuine service failures, so operators can tell an outage from
//! a routine formatting slip.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};

use crate::llm::{ChatMessage, CompletionBackend};
use crate::record::{normalize_category, ClassificationRecord, ItemType, TimeBucket};

pub struct Classifier {
    backend: Arc<dyn CompletionBackend>,
}

impl Classifier {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Classify one note. `now` is the reference instant injected into the
    /// prompt so relative expressions ("tomorrow", "5pm") resolve
    /// deterministically; its offset also localizes naive timestamps in the
    /// reply.
    ///
    /// Transport failures from the backend propagate as `Err`. Malformed
    /// *content* never does — the returned record is always structurally
    /// valid.
    pub async fn classify(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<ClassificationRecord> {
        let messages = vec![
            ChatMessage::system(classification_prompt(now)),
            ChatMessage::user(text),
        ];

        let reply = self.backend.complete(&messages, None).await?;
        let raw = reply.content.unwrap_or_default();
        tracing::debug!("Raw classification response:\n{}", raw);

        Ok(decode_classification(&raw, *now.offset()))
    }
}

fn classification_prompt(now: DateTime<FixedOffset>) -> String {
    format!(
        "You classify short personal notes into a structured record.\n\n\
        Item types (pick exactly one):\n\
        - task: something the user needs to do.\n\
        - event: something happening at a time or place the user wants to attend.\n\
        - idea: a thought, plan, or possibility the user wants to keep.\n\
        - education: something the user wants to learn or study.\n\
        - important_info: a fact worth keeping (numbers, names, references).\n\n\
        Time bucket rules:\n\
        - The current time is {now}. Resolve relative expressions like \
        \"tomorrow\" or \"5pm\" against it.\n\
        - Only tasks and events may get a concrete timestamp; when the note \
        names a specific moment, output it as an RFC 3339 timestamp with \
        date, time, and offset.\n\
        - Otherwise use one of: today, this_week, upcoming, none.\n\
        - Ideas, education, and important_info always use none.\n\n\
        Category (pick exactly one): personal, work, creative, health, money, \
        food, home, travel, learning, admin, wishlist, social, none.\n\n\
        Examples:\n\
        Input: Gym session at 6am on Wednesday\n\
        Output: {{\"item_type\": \"event\", \"time_bucket\": \"2025-12-10T06:00:00-05:00\", \"category\": \"health\"}}\n\
        Input: pay the water bill by friday\n\
        Output: {{\"item_type\": \"task\", \"time_bucket\": \"this_week\", \"category\": \"money\"}}\n\
        Input: what if the garden beds were raised instead\n\
        Output: {{\"item_type\": \"idea\", \"time_bucket\": \"none\", \"category\": \"home\"}}\n\
        Input: look into how transformers handle long context\n\
        Output: {{\"item_type\": \"education\", \"time_bucket\": \"none\", \"category\": \"learning\"}}\n\
        Input: passport renewal confirmation number is 88412\n\
        Output: {{\"item_type\": \"important_info\", \"time_bucket\": \"none\", \"category\": \"admin\"}}\n\n\
        Respond with ONLY a JSON object with exactly these three fields:\n\
        {{\"item_type\": \"...\", \"time_bucket\": \"...\", \"category\": \"...\"}}",
        now = now.to_rfc3339()
    )
}

/// Decode a raw completion reply into a record.
///
/// Whole-decode failure yields the `parse_error` default; a decodable object
/// with missing or bad sub-fields keeps whatever survived, field by field.
fn decode_classification(raw: &str, offset: FixedOffset) -> ClassificationRecord {
    let Some(json) = extract_json(raw) else {
        tracing::warn!("Classification response contained no decodable JSON");
        return ClassificationRecord::parse_failure();
    };

    let value: serde_json::Value = match serde_json::from_str(&json) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Extracted classification JSON failed to parse: {}", e);
            return ClassificationRecord::parse_failure();
        }
    };

    if !value.is_object() {
        tracing::warn!("Classification response was JSON but not an object");
        return ClassificationRecord::parse_failure();
    }

    let item_type = value["item_type"]
        .as_str()
        .map(ItemType::parse)
        .unwrap_or(ItemType::Idea);

    let mut time_bucket = value["time_bucket"]
        .as_str()
        .map(|s| TimeBucket::parse(s, offset))
        .unwrap_or_else(TimeBucket::none);

    // Only tasks and events may carry a concrete timestamp
    if time_bucket.is_concrete() && !item_type.allows_timestamp() {
        tracing::debug!(
            "Demoting concrete timestamp on {} record to none",
            item_type.as_str()
        );
        time_bucket = TimeBucket::none();
    }

    let category = normalize_category(value["category"].as_str());

    ClassificationRecord {
        item_type,
        time_bucket,
        category,
    }
}

/// Extract a JSON object from an LLM response, handling common formatting
/// issues: markdown code fences, surrounding prose, or clean JSON as-is.
fn extract_json(response: &str) -> Option<String> {
    let text = response.trim();

    if let Some(json) = extract_from_markdown_code_block(text) {
        return Some(json);
    }

    if let Some(start) = text.find('{') {
        if let Some(json) = extract_balanced_braces(&text[start..]) {
            return Some(json);
        }
    }

    if serde_json::from_str::<serde_json::Value>(text).is_ok() {
        return Some(text.to_string());
    }

    None
}

/// Extract JSON from markdown code blocks like ```json ... ``` or ``` ... ```
fn extract_from_markdown_code_block(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        if let Some(end) = text[start + 7..].find("```") {
            let json = text[start + 7..start + 7 + end].trim();
            return Some(json.to_string());
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text[start + 3..].find("```") {
            let json = text[start + 3..start + 3 + end].trim();
            if json.starts_with('{') {
                return Some(json.to_string());
            }
        }
    }

    None
}

/// Extract the first balanced `{...}` span, verifying it parses.
fn extract_balanced_braces(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut depth = 0;
    let mut start = None;
    let mut end = None;

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '{' {
            if depth == 0 {
                start = Some(i);
            }
            depth += 1;
        } else if ch == '}' {
            depth -= 1;
            if depth == 0 && start.is_some() {
                end = Some(i);
                break;
            }
        }
    }

    if let (Some(s), Some(e)) = (start, end) {
        let result: String = chars[s..=e].iter().collect();
        if serde_json::from_str::<serde_json::Value>(&result).is_ok() {
            return Some(result);
        }
    }

    None
}
