// Anthropic Provider Adapter
//
// Anthropic Messages API for Claude models.
// Requires API key.
// Default endpoint: https://api.anthropic.com/v1

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::super::stream::sse_data;
use super::super::{provider_error_message, AIError, ProviderAdapter, StreamEvent, WireRequest};
use crate::models::{MessageRole, PromptMessage, ProviderConfig, ProviderId, RequestOptions};

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// List of Claude models that are commonly used
const COMMON_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

// Anthropic SSE event payload
#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<AnthropicDelta>,
    #[serde(default)]
    error: Option<AnthropicErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct AnthropicDelta {
    #[serde(rename = "type", default)]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Anthropic Adapter
#[derive(Debug, Default)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> &str {
        ProviderId::CLAUDE
    }

    fn display_name(&self) -> &str {
        "Anthropic"
    }

    fn default_base_url(&self) -> &str {
        DEFAULT_BASE_URL
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn build_request(
        &self,
        messages: &[PromptMessage],
        options: &RequestOptions,
        config: &ProviderConfig,
    ) -> WireRequest {
        let url = format!("{}/messages", self.resolve_base_url(config));

        // Anthropic takes the system prompt as a top-level field
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let anthropic_messages: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.resolve_model(config)));
        body.insert("max_tokens".to_string(), json!(options.max_tokens));
        body.insert("messages".to_string(), Value::Array(anthropic_messages));
        if !system.is_empty() {
            body.insert("system".to_string(), json!(system.join("\n\n")));
        }
        if let Some(temperature) = options.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if options.stream {
            body.insert("stream".to_string(), json!(true));
        }

        WireRequest::post(url, Value::Object(body))
            .header("x-api-key", config.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn parse_response(&self, body: &Value) -> String {
        body.get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn parse_stream_line(&self, line: &str) -> StreamEvent {
        // `event:` lines are redundant with the payload's `type`
        let Some(data) = sse_data(line) else {
            return StreamEvent::Skip;
        };
        let event = match serde_json::from_str::<AnthropicStreamEvent>(data) {
            Ok(event) => event,
            Err(e) => return StreamEvent::Malformed(e.to_string()),
        };

        match event.event_type.as_str() {
            "content_block_delta" => match event.delta {
                Some(AnthropicDelta { delta_type, text: Some(text) })
                    if delta_type.as_deref().unwrap_or("text_delta") == "text_delta" =>
                {
                    StreamEvent::Delta(text)
                }
                _ => StreamEvent::Skip,
            },
            "message_stop" => StreamEvent::Done,
            "error" => StreamEvent::Error(
                event
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "stream error".to_string()),
            ),
            _ => StreamEvent::Skip,
        }
    }

    fn error_from_response(&self, status: u16, body: &str) -> AIError {
        AIError::from_status(status, provider_error_message(body))
    }

    fn response_has_message(&self, body: &Value) -> bool {
        body.pointer("/content/0").is_some()
    }

    fn known_models(&self) -> Vec<String> {
        COMMON_MODELS.iter().map(|m| m.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> ProviderConfig {
        ProviderConfig::new("Test Claude", ProviderId::claude(), "test-key")
    }

    #[test]
    fn test_build_request_moves_system_prompt() {
        let adapter = AnthropicAdapter::new();
        let request = adapter.build_request(
            &[
                PromptMessage::system("context"),
                PromptMessage::user("q"),
                PromptMessage::assistant("a"),
            ],
            &RequestOptions::default(),
            &create_test_config(),
        );

        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(request.header_value("x-api-key"), Some("test-key"));
        assert_eq!(request.header_value("anthropic-version"), Some("2023-06-01"));
        let body = request.body.unwrap();
        assert_eq!(body["system"], "context");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_parse_response() {
        let adapter = AnthropicAdapter::new();
        let body = json!({"content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": " world"}]});
        assert_eq!(adapter.parse_response(&body), "Hello world");
        assert_eq!(adapter.parse_response(&json!({})), "");
    }

    #[test]
    fn test_parse_stream_lines() {
        let adapter = AnthropicAdapter::new();
        assert_eq!(adapter.parse_stream_line("event: content_block_delta"), StreamEvent::Skip);
        assert_eq!(
            adapter.parse_stream_line(
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"要点"}}"#
            ),
            StreamEvent::Delta("要点".to_string())
        );
        assert_eq!(
            adapter.parse_stream_line(r#"data: {"type":"message_start","message":{}}"#),
            StreamEvent::Skip
        );
        assert_eq!(adapter.parse_stream_line(r#"data: {"type":"message_stop"}"#), StreamEvent::Done);
        assert_eq!(
            adapter.parse_stream_line(r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#),
            StreamEvent::Error("Overloaded".to_string())
        );
        assert!(matches!(adapter.parse_stream_line("data: {not json"), StreamEvent::Malformed(_)));
    }

    #[test]
    fn test_error_from_response() {
        let adapter = AnthropicAdapter::new();
        let err = adapter.error_from_response(
            404,
            r#"{"type":"error","error":{"type":"not_found_error","message":"model: claude-x"}}"#,
        );
        assert_eq!(err.to_string(), "model: claude-x");
        assert_eq!(err.code().as_str(), "AI_MODEL_NOT_FOUND");
    }
}
