// Google Gemini Provider Adapter
//
// Gemini generateContent API. No native streaming is used; the service
// replays the finished text through the simulated stream.
// Default endpoint: https://generativelanguage.googleapis.com/v1beta

use serde_json::{json, Map, Value};

use super::super::{provider_error_message, AIError, ProviderAdapter, WireRequest};
use crate::models::{MessageRole, PromptMessage, ProviderConfig, ProviderId, RequestOptions};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Reported by validation since no listing call is made
const FALLBACK_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
];

/// Gemini only knows "user" and "model"
fn to_gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Assistant => "model",
        MessageRole::User | MessageRole::System => "user",
    }
}

/// Gemini Adapter
#[derive(Debug, Default)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Fold system messages into the first user turn
    fn to_contents(messages: &[PromptMessage]) -> Vec<Value> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let mut pending_system = if system.is_empty() { None } else { Some(system.join("\n\n")) };

        let mut contents: Vec<Value> = Vec::new();
        for message in messages.iter().filter(|m| m.role != MessageRole::System) {
            let text = match (message.role, pending_system.take()) {
                (MessageRole::User, Some(system)) => format!("{}\n\n{}", system, message.content),
                (_, leftover) => {
                    pending_system = leftover;
                    message.content.clone()
                }
            };
            contents.push(json!({
                "role": to_gemini_role(message.role),
                "parts": [{ "text": text }],
            }));
        }

        // Only a system message was given
        if let Some(system) = pending_system {
            contents.insert(0, json!({ "role": "user", "parts": [{ "text": system }] }));
        }
        contents
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> &str {
        ProviderId::GEMINI
    }

    fn display_name(&self) -> &str {
        "Google Gemini"
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
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.resolve_base_url(config),
            self.resolve_model(config),
            urlencoding::encode(&config.api_key)
        );

        let mut generation_config = Map::new();
        generation_config.insert("maxOutputTokens".to_string(), json!(options.max_tokens));
        if let Some(temperature) = options.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }

        WireRequest::post(
            url,
            json!({
                "contents": Self::to_contents(messages),
                "generationConfig": Value::Object(generation_config),
            }),
        )
    }

    fn parse_response(&self, body: &Value) -> String {
        body.pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn supports_streaming(&self) -> bool {
        false
    }

    fn error_from_response(&self, status: u16, body: &str) -> AIError {
        AIError::from_status(status, provider_error_message(body))
    }

    fn response_has_message(&self, body: &Value) -> bool {
        body.pointer("/candidates/0/content/parts/0/text").is_some()
    }

    fn known_models(&self) -> Vec<String> {
        FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
    }
}
