// OpenAI Provider Adapter
//
// OpenAI-compatible chat completions API.
// Requires API key.
// Default endpoint: https://api.openai.com/v1

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::super::quirks::ModelQuirks;
use super::super::stream::sse_data;
use super::super::{provider_error_message, AIError, ProviderAdapter, StreamEvent, WireRequest};
use crate::models::{PromptMessage, ProviderConfig, ProviderId, RequestOptions};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// List of GPT models that are commonly used for chat
const COMMON_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
];

// OpenAI streaming chunk
#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModelsResponse {
    #[serde(default)]
    data: Vec<OpenAIModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModel {
    id: String,
}

/// OpenAI Adapter
pub struct OpenAIAdapter {
    quirks: ModelQuirks,
}

impl OpenAIAdapter {
    pub fn new() -> Self {
        Self {
            quirks: ModelQuirks::default(),
        }
    }

    pub fn with_quirks(quirks: ModelQuirks) -> Self {
        Self { quirks }
    }

    pub fn quirks(&self) -> &ModelQuirks {
        &self.quirks
    }

    /// Chat-capable model ids ("gpt-*", "o1", "o3-mini", ...)
    fn is_chat_model(id: &str) -> bool {
        if id.contains("gpt") {
            return true;
        }
        let mut chars = id.chars();
        chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
    }
}

impl Default for OpenAIAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for OpenAIAdapter {
    fn id(&self) -> &str {
        ProviderId::OPENAI
    }

    fn display_name(&self) -> &str {
        "OpenAI"
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
        let model = self.resolve_model(config);
        let url = format!("{}/chat/completions", self.resolve_base_url(config));

        let openai_messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = Map::new();
        body.insert("model".to_string(), json!(model));
        body.insert("messages".to_string(), Value::Array(openai_messages));
        body.insert(
            self.quirks.token_param(&model).field_name().to_string(),
            json!(options.max_tokens),
        );
        if let Some(temperature) = self.quirks.temperature(&model, options.temperature) {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if options.stream {
            body.insert("stream".to_string(), json!(true));
        }

        WireRequest::post(url, Value::Object(body))
            .header("authorization", format!("Bearer {}", config.api_key))
    }

    fn parse_response(&self, body: &Value) -> String {
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn parse_stream_line(&self, line: &str) -> StreamEvent {
        let Some(data) = sse_data(line) else {
            return StreamEvent::Skip;
        };
        if data == "[DONE]" {
            return StreamEvent::Done;
        }
        if let Ok(value) = serde_json::from_str::<Value>(data) {
            if let Some(message) = value.pointer("/error/message").and_then(Value::as_str) {
                return StreamEvent::Error(message.to_string());
            }
        }
        match serde_json::from_str::<OpenAIStreamChunk>(data) {
            Ok(chunk) => match chunk.choices.into_iter().next().and_then(|c| c.delta.content) {
                Some(text) => StreamEvent::Delta(text),
                None => StreamEvent::Skip,
            },
            Err(e) => StreamEvent::Malformed(e.to_string()),
        }
    }

    fn error_from_response(&self, status: u16, body: &str) -> AIError {
        AIError::from_status(status, provider_error_message(body))
    }

    fn response_has_message(&self, body: &Value) -> bool {
        body.pointer("/choices/0/message").is_some()
    }

    fn models_request(&self, config: &ProviderConfig) -> Option<WireRequest> {
        let url = format!("{}/models", self.resolve_base_url(config));
        Some(WireRequest::get(url).header("authorization", format!("Bearer {}", config.api_key)))
    }

    fn parse_models(&self, body: &Value) -> Vec<String> {
        serde_json::from_value::<OpenAIModelsResponse>(body.clone())
            .map(|r| {
                r.data
                    .into_iter()
                    .map(|m| m.id)
                    .filter(|id| Self::is_chat_model(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn known_models(&self) -> Vec<String> {
        COMMON_MODELS.iter().map(|m| m.to_string()).collect()
    }
}
