// AI Service Module
// Provider adapters, streaming, caching, rate limiting and the orchestration
// service built on top of them

pub mod cache;
pub mod clock;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod quirks;
pub mod rate_limit;
pub mod service;
pub mod stream;
pub mod transport;
pub mod validation;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub use cache::{cache_key, summary_cache_key, CacheEntry, ResponseCache, SummaryCacheInput};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AIError, AIErrorCode, AIResult};
pub use prompt::PromptBuilder;
pub use providers::{AnthropicAdapter, GeminiAdapter, OpenAIAdapter};
pub use quirks::{ModelQuirks, ModelRule, TokenParam};
pub use rate_limit::{RateLimitWindow, RateLimiter};
pub use service::{AIService, GenerationPhase, ServiceOptions};
pub use stream::{ChunkCallback, SimulatedStream, SseDecoder, StreamContext, StreamEvent};
pub use transport::{
    HttpMethod, HttpTransport, ReqwestTransport, StreamingResponse, StubReply, StubTransport,
    WireRequest, WireResponse,
};

use crate::models::{PromptMessage, ProviderConfig, ProviderId, RequestOptions};

/// Wire-format knowledge of one provider
///
/// Adapters are pure: they describe requests and interpret responses, and
/// never perform I/O themselves. The service pairs them with an
/// [`HttpTransport`].
pub trait ProviderAdapter: Send + Sync {
    /// Registry key, e.g. "openai"
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn default_base_url(&self) -> &str;

    fn default_model(&self) -> &str;

    /// Build the generation request
    fn build_request(
        &self,
        messages: &[PromptMessage],
        options: &RequestOptions,
        config: &ProviderConfig,
    ) -> WireRequest;

    /// Extract the generated text from a successful response body
    ///
    /// Returns an empty string when the expected field is missing.
    fn parse_response(&self, body: &Value) -> String;

    /// Whether the provider can answer with a native SSE stream
    fn supports_streaming(&self) -> bool;

    /// Interpret one SSE line
    fn parse_stream_line(&self, _line: &str) -> StreamEvent {
        StreamEvent::Skip
    }

    /// Map a non-2xx response to an error
    fn error_from_response(&self, status: u16, body: &str) -> AIError;

    /// Whether a successful validation response actually carried a message
    fn response_has_message(&self, body: &Value) -> bool;

    /// Optional model-listing request
    fn models_request(&self, _config: &ProviderConfig) -> Option<WireRequest> {
        None
    }

    fn parse_models(&self, _body: &Value) -> Vec<String> {
        Vec::new()
    }

    /// Static model list reported when no listing endpoint is used
    fn known_models(&self) -> Vec<String> {
        Vec::new()
    }

    /// Model from the config, else the adapter default
    fn resolve_model(&self, config: &ProviderConfig) -> String {
        config
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model())
            .to_string()
    }

    /// Base URL from the config without trailing slash, else the adapter default
    fn resolve_base_url(&self, config: &ProviderConfig) -> String {
        config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }
}

/// Provider adapters keyed by provider id
#[derive(Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register (or replace) an adapter under its id
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id().to_string(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, id: &ProviderId) -> AIResult<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| AIError::UnknownProvider(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::empty()
            .with(Arc::new(OpenAIAdapter::new()))
            .with(Arc::new(AnthropicAdapter::new()))
            .with(Arc::new(GeminiAdapter::new()))
    }
}

/// Pull a human-readable message out of a provider error body
pub(crate) fn provider_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.pointer("/message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_error_code_str() {
        assert_eq!(AIErrorCode::UnknownProvider.as_str(), "AI_UNKNOWN_PROVIDER");
        assert_eq!(AIErrorCode::RateLimited.as_str(), "AI_RATE_LIMITED");
    }

    #[test]
    fn test_default_registry() {
        let registry = ProviderRegistry::default();
        assert_eq!(registry.ids(), vec!["claude", "gemini", "openai"]);
        assert!(registry.get(&ProviderId::gemini()).is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::default();
        let err = registry.get(&ProviderId::new("mistral")).err().unwrap();
        assert!(matches!(err, AIError::UnknownProvider(ref id) if id == "mistral"));
    }

    #[test]
    fn test_provider_error_message() {
        assert_eq!(
            provider_error_message(r#"{"error":{"message":"Incorrect API key"}}"#),
            Some("Incorrect API key".to_string())
        );
        assert_eq!(provider_error_message("<html>"), None);
    }

    #[test]
    fn test_resolve_defaults() {
        let adapter = OpenAIAdapter::new();
        let config = ProviderConfig::new("t", ProviderId::openai(), "k")
            .with_base_url("https://proxy.test/v1/");
        assert_eq!(adapter.resolve_base_url(&config), "https://proxy.test/v1");
        assert_eq!(adapter.resolve_model(&config), "gpt-4o-mini");
    }
}
