//! Local capabilities the conversational assistant can invoke.
//!
//! Each tool declares a JSON Schema for its parameters, enabling LLM
//! function-calling. Tools are registered in a thread-safe registry that
//! generates OpenAI-format function definitions for the completion request.
//! Adding a tool means implementing [`Tool`] and registering it; the
//! orchestrator needs no new branching.

pub mod calendar;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The result of executing a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolOutput {
    /// Successful text output
    Text(String),
    /// Successful structured output
    Json(serde_json::Value),
    /// Tool execution failed
    Error(String),
}

impl ToolOutput {
    /// Convert to a string representation suitable for feeding back to the LLM
    pub fn to_llm_string(&self) -> String {
        match self {
            ToolOutput::Text(s) => s.clone(),
            ToolOutput::Json(v) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
            ToolOutput::Error(e) => format!("[ERROR] {}", e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutput::Text(_) | ToolOutput::Json(_))
    }
}

/// A tool provides the assistant with a local capability, invoked on demand
/// mid-conversation. Parameters are declared as a JSON Schema so the LLM can
/// emit schema-conforming invocation requests.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used in function-calling (e.g., "create_calendar_event")
    fn name(&self) -> &str;

    /// Human-readable description shown to the LLM
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's parameters, used directly in
    /// OpenAI-format function definitions.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput>;
}

/// OpenAI-format function definition for LLM function-calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// OpenAI-format tool definition (wraps FunctionDef)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

/// A tool call after argument decoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of a tool call, ready to feed back to the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub name: String,
    pub output: ToolOutput,
}

/// Thread-safe registry of available tools: lookup by name plus generation of
/// OpenAI-format function definitions for completion requests.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        tracing::info!("Registered tool: {}", name);
        self.tools.write().await.insert(name, tool);
    }

    /// Get a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    /// Generate OpenAI-format tool definitions for all registered tools.
    ///
    /// This output can be passed directly to the `tools` parameter of an
    /// OpenAI-compatible chat completions request.
    pub async fn tool_definitions(&self) -> Vec<ToolDef> {
        let tools = self.tools.read().await;
        tools
            .values()
            .map(|tool| ToolDef {
                tool_type: "function".to_string(),
                function: FunctionDef {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    }

    /// Execute a tool call. Unknown tools and execution failures come back as
    /// `ToolOutput::Error`; the orchestrator decides how to degrade.
    pub async fn execute_call(&self, call: &ToolCall) -> ToolCallResult {
        let tool = match self.get(&call.name).await {
            Some(t) => t,
            None => {
                return ToolCallResult {
                    name: call.name.clone(),
                    output: ToolOutput::Error(format!("Unknown tool: {}", call.name)),
                };
            }
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(output) => ToolCallResult {
                name: call.name.clone(),
                output,
            },
            Err(e) => ToolCallResult {
                name: call.name.clone(),
                output: ToolOutput::Error(format!("Tool execution failed: {}", e)),
            },
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes back the input message"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "The message to echo"
                    }
                },
                "required": ["message"]
            })
        }

        async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput> {
            let message = params["message"].as_str().unwrap_or("(no message)");
            Ok(ToolOutput::Text(message.to_string()))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _params: serde_json::Value) -> Result<ToolOutput> {
            anyhow::bail!("deliberate failure")
        }
    }

    #[tokio::test]
    async fn registry_register_and_get() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;

        assert!(registry.get("echo").await.is_some());
        assert!(registry.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn tool_definitions_are_openai_format() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;

        let defs = registry.tool_definitions().await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].tool_type, "function");
        assert_eq!(defs[0].function.name, "echo");

        let json = serde_json::to_string(&defs).unwrap();
        assert!(json.contains("echo"));
    }

    #[tokio::test]
    async fn execute_echo_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).await;

        let call = ToolCall {
            name: "echo".to_string(),
            arguments: serde_json::json!({"message": "hello"}),
        };

        let result = registry.execute_call(&call).await;
        assert_eq!(result.name, "echo");
        assert!(result.output.is_success());
        assert_eq!(result.output.to_llm_string(), "hello");
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_output() {
        let registry = ToolRegistry::new();

        let call = ToolCall {
            name: "nonexistent".to_string(),
            arguments: serde_json::json!({}),
        };

        let result = registry.execute_call(&call).await;
        assert!(!result.output.is_success());
        assert!(result.output.to_llm_string().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn failing_tool_is_captured_as_error_output() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool)).await;

        let call = ToolCall {
            name: "failing".to_string(),
            arguments: serde_json::json!({}),
        };

        let result = registry.execute_call(&call).await;
        assert!(!result.output.is_success());
        assert!(result.output.to_llm_string().contains("deliberate failure"));
    }
}
