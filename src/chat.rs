//! Conversational tool orchestrator.
//!
//! One chat turn runs a bounded two-round protocol: the model either answers
//! directly or requests a tool; at most one tool executes; the follow-up round
//! runs without tool schemas so the turn always terminates within
//! [`MAX_TOOL_ROUNDS`] completion calls.

use std::sync::Arc;

use anyhow::Result;

use crate::llm::{ChatMessage, CompletionBackend};
use crate::tools::{ToolCall, ToolRegistry};

/// Hard cap on completion rounds per chat turn.
pub const MAX_TOOL_ROUNDS: usize = 2;

/// Returned when a round produces no usable text.
pub const FALLBACK_REPLY: &str = "Sorry, I don't have an answer for that right now.";

/// Returned in place of the answer when the completion service is down.
/// Surfaced as-is; the orchestrator never retries.
pub const SERVICE_ERROR_REPLY: &str =
    "Sorry, I couldn't reach the assistant right now. Please try again in a moment.";

const SYSTEM_INSTRUCTION: &str = "You are a helpful and clear assistant that manages a user's \
    brain dump of notes, tasks, and events. \
    Use the provided tools when the user's request requires action, like adding an event. \
    Answer directly otherwise. \
    Keep responses short and at a fourth-grade reading level.";

/// One prior turn of the dialogue, as supplied by the caller.
/// `role` is `user` or `model`; history is never persisted by the core.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub text: String,
}

pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    registry: Arc<ToolRegistry>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn CompletionBackend>, registry: Arc<ToolRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Run one chat turn to completion. Never errors to its caller: transport
    /// failures surface as a single human-readable error string.
    pub async fn respond(&self, history: &[ConversationTurn], prompt: &str) -> String {
        match self.run(history, prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Chat turn failed: {:#}", e);
                SERVICE_ERROR_REPLY.to_string()
            }
        }
    }

    async fn run(&self, history: &[ConversationTurn], prompt: &str) -> Result<String> {
        let mut messages = vec![ChatMessage::system(SYSTEM_INSTRUCTION)];
        for turn in history {
            // Callers speak in user/model roles; the wire format says assistant
            if turn.role == "model" || turn.role == "assistant" {
                messages.push(ChatMessage::assistant(turn.text.clone()));
            } else {
                messages.push(ChatMessage::user(turn.text.clone()));
            }
        }
        messages.push(ChatMessage::user(prompt.to_string()));

        // Round 1 of MAX_TOOL_ROUNDS: tools attached
        let tool_defs = self.registry.tool_definitions().await;
        let round1 = self.backend.complete(&messages, Some(&tool_defs)).await?;
        let round1_text = non_empty(round1.content.as_deref());

        let requested = round1.requested_tool_calls();
        let Some(first_call) = requested.first().cloned() else {
            return Ok(round1_text.unwrap_or_else(|| FALLBACK_REPLY.to_string()));
        };
        if requested.len() > 1 {
            tracing::debug!(
                "Ignoring {} extra tool request(s) in the same round",
                requested.len() - 1
            );
        }

        let arguments: serde_json::Value = serde_json::from_str(&first_call.function.arguments)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to parse tool arguments as JSON: {}", e);
                serde_json::json!({})
            });

        let call = ToolCall {
            name: first_call.function.name.clone(),
            arguments,
        };
        tracing::info!("Executing tool '{}' for chat turn", call.name);
        let result = self.registry.execute_call(&call).await;

        if !result.output.is_success() {
            // Unknown tool or failed execution: degrade to the pre-tool text
            tracing::warn!(
                "Tool '{}' unusable ({}); answering with round-1 text",
                call.name,
                result.output.to_llm_string()
            );
            return Ok(round1_text.unwrap_or_else(|| FALLBACK_REPLY.to_string()));
        }

        // Extend the dialogue: the model turn carrying the original request,
        // then a tool turn carrying {name, result}
        messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: round1.content.clone(),
            tool_calls: Some(vec![first_call.clone()]),
            tool_call_id: None,
        });
        let result_payload = serde_json::json!({
            "name": result.name,
            "result": result.output.to_llm_string(),
        });
        messages.push(ChatMessage::tool_result(
            first_call.id.clone(),
            result_payload.to_string(),
        ));

        // Round 2: no tools attached, so the turn terminates here
        let round2 = self.backend.complete(&messages, None).await?;
        Ok(non_empty(round2.content.as_deref()).unwrap_or_else(|| FALLBACK_REPLY.to_string()))
    }
}

fn non_empty(content: Option<&str>) -> Option<String> {
    content
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
