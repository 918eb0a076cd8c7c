// AI provider data models
// Provider configuration, generic prompt messages and validation results

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a registered provider adapter ("openai", "claude", "gemini", ...)
///
/// Kept as an open string so that settings written by a newer build with an
/// extra provider still load; resolution against the registry decides whether
/// the id is usable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub const OPENAI: &'static str = "openai";
    pub const CLAUDE: &'static str = "claude";
    pub const GEMINI: &'static str = "gemini";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    pub fn openai() -> Self {
        Self::new(Self::OPENAI)
    }

    pub fn claude() -> Self {
        Self::new(Self::CLAUDE)
    }

    pub fn gemini() -> Self {
        Self::new(Self::GEMINI)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// User-configured connection to one AI provider
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// User-defined display name
    pub name: String,
    /// Which adapter handles this config
    pub provider: ProviderId,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the adapter's default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Overrides the adapter's default model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            provider,
            api_key: api_key.into(),
            base_url: None,
            model: None,
            is_default: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = if base_url.trim().is_empty() { None } else { Some(base_url) };
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = if model.trim().is_empty() { None } else { Some(model) };
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// The API key never shows up in logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("api_key", &if self.has_api_key() { "***" } else { "" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("is_default", &self.is_default)
            .finish()
    }
}

/// Role of a provider-neutral prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Provider-neutral message handed to an adapter's request builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: MessageRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: MessageRole::Assistant, content: content.into() }
    }
}

/// Per-request generation knobs
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Ask the provider for a chunked (SSE) response
    pub stream: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: Some(0.7),
            stream: false,
        }
    }
}

/// Operation class used for cache keys and rate windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Summary,
    Chat,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Summary => "summary",
            OperationKind::Chat => "chat",
        }
    }
}

/// Outcome of a connection test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_supported: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_models: Option<Vec<String>>,
}

impl ValidationResult {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_normalizes() {
        assert_eq!(ProviderId::new(" OpenAI ").as_str(), "openai");
        assert_eq!(ProviderId::from("claude"), ProviderId::claude());
    }

    #[test]
    fn test_provider_config_debug_hides_key() {
        let config = ProviderConfig::new("Test", ProviderId::openai(), "sk-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_provider_config_serde_camel_case() {
        let config = ProviderConfig::new("Test", ProviderId::gemini(), "key")
            .with_model("gemini-1.5-flash")
            .with_base_url("");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["apiKey"], "key");
        assert_eq!(json["provider"], "gemini");
        assert!(json.get("baseUrl").is_none());
    }
}
