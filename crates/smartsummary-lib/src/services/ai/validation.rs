// API connection validation
// One minimal generation call plus best-effort model discovery

use serde_json::Value;
use std::sync::Arc;

use super::service::{redact_query, AIService};
use super::{ProviderAdapter, WireRequest};
use crate::models::{PromptMessage, ProviderConfig, RequestOptions, ValidationResult};

const VALIDATION_PROMPT: &str = "Hello, this is a test message to validate API connection.";

impl AIService {
    /// Test `config` with a tiny request through its adapter
    ///
    /// Never fails: problems are reported in the result. The cache and the
    /// rate windows are left untouched.
    pub async fn validate_connection(&self, config: &ProviderConfig) -> ValidationResult {
        let adapter = match self.resolve_adapter(config) {
            Ok(adapter) => adapter,
            Err(e) => return ValidationResult::invalid(e.to_string()),
        };

        let available_models = match adapter.models_request(config) {
            Some(request) => self.fetch_models(&adapter, request).await,
            None => adapter.known_models(),
        };

        let options = RequestOptions {
            max_tokens: self.options().validation_max_tokens,
            temperature: self.options().temperature,
            stream: false,
        };
        let request = adapter.build_request(&[PromptMessage::user(VALIDATION_PROMPT)], &options, config);
        log::debug!("[{}] Validating via {}", adapter.id(), redact_query(&request.url));

        let response = match self.with_timeout(self.transport().send(request)).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("[{}] Validation request failed: {}", adapter.id(), e);
                return ValidationResult::invalid(e.to_string());
            }
        };

        if !response.is_success() {
            let error = adapter.error_from_response(response.status, &response.body);
            log::info!("[{}] Validation rejected: {}", adapter.id(), error);
            return ValidationResult {
                available_models: Some(available_models).filter(|m| !m.is_empty()),
                ..ValidationResult::invalid(error.to_string())
            };
        }

        let body: Value = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(e) => return ValidationResult::invalid(format!("Response parse error: {}", e)),
        };

        let model_supported = adapter.response_has_message(&body);
        log::info!(
            "[{}] Connection valid (model supported: {})",
            adapter.display_name(),
            model_supported
        );
        ValidationResult {
            is_valid: true,
            error: None,
            model_supported: Some(model_supported),
            available_models: Some(available_models),
        }
    }

    async fn fetch_models(&self, adapter: &Arc<dyn ProviderAdapter>, request: WireRequest) -> Vec<String> {
        match self.with_timeout(self.transport().send(request)).await {
            Ok(response) if response.is_success() => serde_json::from_str::<Value>(&response.body)
                .map(|body| adapter.parse_models(&body))
                .unwrap_or_default(),
            Ok(response) => {
                log::warn!("[{}] Model listing returned {}", adapter.id(), response.status);
                Vec::new()
            }
            Err(e) => {
                log::warn!("[{}] Failed to fetch available models: {}", adapter.id(), e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{ProviderConfig, ProviderId};
    use crate::services::ai::{
        AIService, HttpMethod, ManualClock, ProviderRegistry, ServiceOptions, StubReply, StubTransport,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn service(stub: Arc<StubTransport>) -> AIService {
        let placeholder = ProviderConfig::new("unused", ProviderId::openai(), "");
        AIService::with_dependencies(
            placeholder,
            ProviderRegistry::default(),
            stub,
            Arc::new(ManualClock::new(0)),
            ServiceOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_openai_validation_lists_models() {
        let stub = Arc::new(StubTransport::with_replies(vec![
            StubReply::json(json!({"data": [{"id": "gpt-4o"}, {"id": "dall-e-3"}]})),
            StubReply::json(json!({"choices": [{"message": {"content": "Hi"}}]})),
        ]));
        let config = ProviderConfig::new("O", ProviderId::openai(), "sk");
        let result = service(stub.clone()).validate_connection(&config).await;

        assert!(result.is_valid);
        assert_eq!(result.model_supported, Some(true));
        assert_eq!(result.available_models, Some(vec!["gpt-4o".to_string()]));

        let requests = stub.requests();
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[1].body.as_ref().unwrap()["max_tokens"], 10);
    }

    #[tokio::test]
    async fn test_model_listing_failure_is_ignored() {
        let stub = Arc::new(StubTransport::with_replies(vec![
            StubReply::Fail("dns".to_string()),
            StubReply::json(json!({"choices": []})),
        ]));
        let config = ProviderConfig::new("O", ProviderId::openai(), "sk");
        let result = service(stub).validate_connection(&config).await;

        assert!(result.is_valid);
        assert_eq!(result.model_supported, Some(false));
        assert_eq!(result.available_models, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_rejected_key() {
        let stub = Arc::new(StubTransport::with_replies(vec![StubReply::status(
            401,
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        )]));
        let config = ProviderConfig::new("C", ProviderId::claude(), "bad");
        let result = service(stub.clone()).validate_connection(&config).await;

        assert!(!result.is_valid);
        assert_eq!(result.error.as_deref(), Some("invalid x-api-key"));
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_and_unknown_provider() {
        let stub = Arc::new(StubTransport::new());
        let svc = service(stub.clone());

        let result = svc.validate_connection(&ProviderConfig::new("G", ProviderId::gemini(), " ")).await;
        assert!(!result.is_valid);
        let result = svc.validate_connection(&ProviderConfig::new("X", ProviderId::new("x"), "k")).await;
        assert!(result.error.unwrap().contains("x"));
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn test_gemini_reports_static_models() {
        let stub = Arc::new(StubTransport::with_replies(vec![StubReply::json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hi"}]}}]
        }))]));
        let config = ProviderConfig::new("G", ProviderId::gemini(), "k");
        let result = service(stub).validate_connection(&config).await;

        assert!(result.is_valid);
        assert_eq!(result.model_supported, Some(true));
        assert!(result.available_models.unwrap().contains(&"gemini-1.5-flash".to_string()));
    }

    #[tokio::test]
    async fn test_validation_does_not_consume_rate_window() {
        let replies = (0..4).map(|_| StubReply::json(json!({"content": [{"type": "text", "text": "ok"}]})));
        let stub = Arc::new(StubTransport::with_replies(replies));
        let config = ProviderConfig::new("C", ProviderId::claude(), "k");
        let svc = AIService::with_dependencies(
            config.clone(),
            ProviderRegistry::default(),
            stub,
            Arc::new(ManualClock::new(0)),
            ServiceOptions { rate_limit: 1, ..ServiceOptions::default() },
        );

        for _ in 0..3 {
            assert!(svc.validate_connection(&config).await.is_valid);
        }
        let summary = svc
            .generate_summary("x", &Default::default(), Default::default(), None)
            .await
            .unwrap();
        assert_eq!(summary, "ok");
    }
}
