//! Text-completion capability
//!
//! The tool selector and the fusion synthesizer both depend on this one
//! seam: a decision procedure that takes a prompt plus a fixed tool menu
//! and returns either tool invocations or free text. Tests substitute a
//! deterministic stub; production speaks an OpenAI-compatible
//! chat-completions API.

use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors from the completion capability
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The endpoint could not be reached or timed out
    #[error("Completion endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint rejected the request or returned garbage
    #[error("Completion failed: {0}")]
    Failed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for completion operations
pub type CompletionResult<T> = Result<T, CompletionError>;

/// One tool offered to the decision procedure
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema for the tool's parameters
    pub parameters: Value,
}

/// One tool invocation the decision procedure produced
#[derive(Debug, Clone)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: serde_json::Map<String, Value>,
}

/// The decision procedure's output: tool invocations and/or free text
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub tool_calls: Vec<RawToolCall>,
    pub text: Option<String>,
}

/// Pluggable decision procedure.
///
/// Non-deterministic in production; callers treat the output as a
/// constraint-satisfying set, never an exact expectation.
#[async_trait]
pub trait DecisionProcedure: Send + Sync + Debug {
    /// Ask for a decision over a fixed tool menu.
    ///
    /// With `require_tool` the model must call at least one tool; without
    /// it the model may answer in free text instead.
    async fn decide(
        &self,
        prompt: &str,
        tools: &[ToolSpec],
        require_tool: bool,
    ) -> CompletionResult<Decision>;

    /// Plain free-text completion
    async fn complete(&self, prompt: &str) -> CompletionResult<String>;
}

/// Decision procedure speaking an OpenAI-compatible chat-completions API
#[derive(Debug)]
pub struct OpenAiChat {
    client: reqwest::Client,
    config: CompletionConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a str>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'a str,
    function: &'a ToolSpec,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object
    arguments: String,
}

impl OpenAiChat {
    /// Create a new chat-completions client
    pub fn new(config: CompletionConfig) -> CompletionResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            let auth_value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| CompletionError::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else if config.endpoint.contains("openai.com") {
            warn!("No API key provided for {}", config.endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| CompletionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn request(&self, body: &ChatRequest<'_>) -> CompletionResult<ResponseMessage> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| CompletionError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CompletionError::Failed(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Failed(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| CompletionError::Failed("No choices returned".to_string()))
    }
}

#[async_trait]
impl DecisionProcedure for OpenAiChat {
    async fn decide(
        &self,
        prompt: &str,
        tools: &[ToolSpec],
        require_tool: bool,
    ) -> CompletionResult<Decision> {
        let wire_tools: Vec<WireTool> = tools
            .iter()
            .map(|t| WireTool {
                tool_type: "function",
                function: t,
            })
            .collect();

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            tools: Some(wire_tools),
            tool_choice: Some(if require_tool { "required" } else { "auto" }),
            temperature: 0.0,
            max_tokens: self.config.max_tokens,
        };

        debug!(
            "Decision request: {} tools, require_tool={}",
            tools.len(),
            require_tool
        );
        let message = self.request(&body).await?;

        let mut tool_calls = Vec::new();
        for call in message.tool_calls {
            // Arguments arrive JSON-encoded; a malformed call is dropped,
            // not fatal, matching how selection treats unknown tools
            match serde_json::from_str::<Value>(&call.function.arguments) {
                Ok(Value::Object(arguments)) => tool_calls.push(RawToolCall {
                    name: call.function.name,
                    arguments,
                }),
                _ => warn!(
                    "Dropping tool call '{}' with malformed arguments",
                    call.function.name
                ),
            }
        }

        Ok(Decision {
            tool_calls,
            text: message.content,
        })
    }

    async fn complete(&self, prompt: &str) -> CompletionResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            tools: None,
            tool_choice: None,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let message = self.request(&body).await?;
        message
            .content
            .map(|s| s.trim().to_string())
            .ok_or_else(|| CompletionError::Failed("No content returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call_response() {
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "get_gene_associations",
                            "arguments": "{\"target_gene\": \"TP53\"}"
                        }
                    }]
                }
            }]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let message = &parsed.choices[0].message;
        assert!(message.content.is_none());
        assert_eq!(message.tool_calls[0].function.name, "get_gene_associations");
        let args: Value =
            serde_json::from_str(&message.tool_calls[0].function.arguments).unwrap();
        assert_eq!(args["target_gene"], "TP53");
    }

    #[test]
    fn test_parse_text_response() {
        let raw = serde_json::json!({
            "choices": [{
                "message": { "content": "### Key Findings\n..." }
            }]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        assert!(parsed.choices[0].message.tool_calls.is_empty());
        assert!(parsed.choices[0].message.content.is_some());
    }

    #[test]
    fn test_tool_request_serialization() {
        let spec = ToolSpec {
            name: "retrieve_papers_hybrid",
            description: "Search for papers",
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
        };
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "find papers",
            }],
            tools: Some(vec![WireTool {
                tool_type: "function",
                function: &spec,
            }]),
            tool_choice: Some("required"),
            temperature: 0.0,
            max_tokens: 100,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "retrieve_papers_hybrid");
        assert_eq!(json["tool_choice"], "required");
    }
}
