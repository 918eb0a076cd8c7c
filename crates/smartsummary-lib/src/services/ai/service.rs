// AI Orchestration Service
//
// Entry point for summary and chat generation. Handles:
// - Input checks before any I/O
// - Response cache with simulated-stream replay
// - Per-operation rate windows
// - Prompt construction and adapter dispatch
// - Native or simulated streaming to the caller's callback

use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::RwLock;

use super::cache::{summary_cache_key, ResponseCache, DEFAULT_CACHE_TTL_MS};
use super::clock::{Clock, SystemClock};
use super::prompt::PromptBuilder;
use super::rate_limit::{RateLimiter, DEFAULT_RATE_LIMIT, DEFAULT_WINDOW_MS};
use super::stream::{delta_stream, ChunkCallback, SimulatedStream, StreamContext};
use super::transport::{HttpTransport, ReqwestTransport};
use super::{AIError, AIResult, ProviderAdapter, ProviderRegistry};
use crate::models::{
    ChatMessage, OperationKind, PromptMessage, ProviderConfig, RequestOptions, SourceType,
    SummarySettings,
};

/// Tunables of an [`AIService`]
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub cache_ttl: Duration,
    /// Calls allowed per operation and window
    pub rate_limit: u32,
    pub rate_window: Duration,
    pub simulated_stream: SimulatedStream,
    /// Bounds a non-streaming call and the wait for stream headers
    pub request_timeout: Option<Duration>,
    /// Bounds the gap between two stream chunks
    pub stream_idle_timeout: Option<Duration>,
    pub max_output_tokens: u32,
    /// Token limit of the validation probe
    pub validation_max_tokens: u32,
    pub temperature: Option<f32>,
    /// Custom style id -> description
    pub custom_styles: HashMap<String, String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS as u64),
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_window: Duration::from_millis(DEFAULT_WINDOW_MS as u64),
            simulated_stream: SimulatedStream::default(),
            request_timeout: Some(Duration::from_secs(60)),
            stream_idle_timeout: Some(Duration::from_secs(60)),
            max_output_tokens: 2000,
            validation_max_tokens: 10,
            temperature: Some(0.7),
            custom_styles: HashMap::new(),
        }
    }
}

/// Lifecycle of one generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    ValidatingInput,
    CacheCheck,
    RateCheck,
    Requesting,
    Streaming,
    Complete,
}

impl GenerationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPhase::Idle => "idle",
            GenerationPhase::ValidatingInput => "validating-input",
            GenerationPhase::CacheCheck => "cache-check",
            GenerationPhase::RateCheck => "rate-check",
            GenerationPhase::Requesting => "requesting",
            GenerationPhase::Streaming => "streaming",
            GenerationPhase::Complete => "complete",
        }
    }
}

struct PhaseTracker {
    operation: OperationKind,
    phase: GenerationPhase,
}

impl PhaseTracker {
    fn new(operation: OperationKind) -> Self {
        Self {
            operation,
            phase: GenerationPhase::Idle,
        }
    }

    fn advance(&mut self, next: GenerationPhase) {
        log::debug!(
            "[{}] {} -> {}",
            self.operation.as_str(),
            self.phase.as_str(),
            next.as_str()
        );
        self.phase = next;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Main AI service
pub struct AIService {
    config: RwLock<ProviderConfig>,
    registry: ProviderRegistry,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    options: ServiceOptions,
    prompts: PromptBuilder,
    cache: Mutex<ResponseCache>,
    rate_limiter: Mutex<RateLimiter>,
}

impl AIService {
    /// Create a service with the default adapters and a reqwest transport
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_options(config, ServiceOptions::default())
    }

    pub fn with_options(config: ProviderConfig, options: ServiceOptions) -> Self {
        Self::with_dependencies(
            config,
            ProviderRegistry::default(),
            Arc::new(ReqwestTransport::new()),
            Arc::new(SystemClock),
            options,
        )
    }

    /// Create with custom dependencies (for testing)
    pub fn with_dependencies(
        config: ProviderConfig,
        registry: ProviderRegistry,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        options: ServiceOptions,
    ) -> Self {
        let prompts = PromptBuilder::new().with_custom_styles(options.custom_styles.clone());
        let cache = ResponseCache::new(options.cache_ttl.as_millis() as i64);
        let rate_limiter = RateLimiter::new(options.rate_limit, options.rate_window.as_millis() as i64);
        Self {
            config: RwLock::new(config),
            registry,
            transport,
            clock,
            options,
            prompts,
            cache: Mutex::new(cache),
            rate_limiter: Mutex::new(rate_limiter),
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub(crate) fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Snapshot of the current provider config
    pub async fn config(&self) -> ProviderConfig {
        self.config.read().await.clone()
    }

    /// Replace the provider config; calls already running keep their snapshot
    pub async fn update_config(&self, config: ProviderConfig) {
        log::info!("AI config updated: {:?}", config);
        *self.config.write().await = config;
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
    }

    pub fn clear_rate_limit(&self) {
        lock(&self.rate_limiter).clear();
    }

    /// Generate a summary of `content`
    ///
    /// With `on_chunk` set, every delta is forwarded as it arrives and the
    /// returned text is their concatenation. Cache hits are replayed through
    /// the simulated stream without touching the network or the rate window.
    pub async fn generate_summary(
        &self,
        content: &str,
        settings: &SummarySettings,
        source_type: SourceType,
        on_chunk: Option<ChunkCallback<'_>>,
    ) -> AIResult<String> {
        let mut phase = PhaseTracker::new(OperationKind::Summary);
        phase.advance(GenerationPhase::ValidatingInput);
        if content.trim().is_empty() {
            return Err(AIError::EmptyContent);
        }
        let config = self.config().await;
        let adapter = self.resolve_adapter(&config)?;
        let mut ctx = StreamContext::new(on_chunk);

        phase.advance(GenerationPhase::CacheCheck);
        let key = summary_cache_key(content, settings, source_type);
        let cached = lock(&self.cache).get(&key, self.clock.now_millis());
        if let Some(cached) = cached {
            log::info!("Summary cache hit: {}", key);
            if ctx.is_streaming() {
                phase.advance(GenerationPhase::Streaming);
                self.options.simulated_stream.replay(&cached, &mut ctx).await;
            }
            phase.advance(GenerationPhase::Complete);
            return Ok(cached);
        }

        phase.advance(GenerationPhase::RateCheck);
        self.check_rate(OperationKind::Summary)?;

        phase.advance(GenerationPhase::Requesting);
        let messages = self.prompts.summary_messages(content, settings, source_type);
        let text = self
            .run_generation(&adapter, &config, &messages, &mut ctx, &mut phase)
            .await?;

        if !text.is_empty() {
            lock(&self.cache).insert(key, text.clone(), self.clock.now_millis());
        }
        phase.advance(GenerationPhase::Complete);
        log::info!(
            "Summary generated via {} ({} chars)",
            adapter.display_name(),
            text.chars().count()
        );
        Ok(text)
    }

    /// Answer the last user turn of `messages`, grounded on `context`
    ///
    /// Chat responses are never cached.
    pub async fn generate_chat_response(
        &self,
        messages: &[ChatMessage],
        context: Option<&str>,
        on_chunk: Option<ChunkCallback<'_>>,
    ) -> AIResult<String> {
        let mut phase = PhaseTracker::new(OperationKind::Chat);
        phase.advance(GenerationPhase::ValidatingInput);
        if messages.iter().all(|m| m.content.trim().is_empty()) {
            return Err(AIError::EmptyContent);
        }
        let config = self.config().await;
        let adapter = self.resolve_adapter(&config)?;
        let mut ctx = StreamContext::new(on_chunk);

        phase.advance(GenerationPhase::RateCheck);
        self.check_rate(OperationKind::Chat)?;

        phase.advance(GenerationPhase::Requesting);
        let prompt = self.prompts.chat_messages(messages, context);
        let text = self
            .run_generation(&adapter, &config, &prompt, &mut ctx, &mut phase)
            .await?;

        phase.advance(GenerationPhase::Complete);
        Ok(text)
    }

    /// API key check and adapter lookup, shared by every operation
    pub(crate) fn resolve_adapter(&self, config: &ProviderConfig) -> AIResult<Arc<dyn ProviderAdapter>> {
        if !config.has_api_key() {
            return Err(AIError::MissingApiKey);
        }
        self.registry.get(&config.provider)
    }

    fn check_rate(&self, kind: OperationKind) -> AIResult<()> {
        let result = lock(&self.rate_limiter).check_and_increment(kind, self.clock.now_millis());
        if let Err(AIError::RateLimited { retry_after_secs }) = &result {
            log::warn!("[{}] Rate limit reached, retry in {}s", kind.as_str(), retry_after_secs);
        }
        result
    }

    fn request_options(&self, max_tokens: u32) -> RequestOptions {
        RequestOptions {
            max_tokens,
            temperature: self.options.temperature,
            stream: false,
        }
    }

    pub(crate) async fn with_timeout<T, F>(&self, fut: F) -> AIResult<T>
    where
        F: Future<Output = AIResult<T>>,
    {
        match self.options.request_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| AIError::Timeout)?,
            None => fut.await,
        }
    }

    /// Send one generation request and deliver its text through `ctx`
    async fn run_generation(
        &self,
        adapter: &Arc<dyn ProviderAdapter>,
        config: &ProviderConfig,
        messages: &[PromptMessage],
        ctx: &mut StreamContext<'_>,
        phase: &mut PhaseTracker,
    ) -> AIResult<String> {
        let mut options = self.request_options(self.options.max_output_tokens);

        if ctx.is_streaming() && adapter.supports_streaming() {
            options.stream = true;
            let request = adapter.build_request(messages, &options, config);
            log::debug!("[{}] POST {} (stream)", adapter.id(), redact_query(&request.url));

            let response = self.with_timeout(self.transport.send_stream(request)).await?;
            if !response.is_success() {
                let status = response.status;
                let body = self.with_timeout(response.collect_body()).await?;
                return Err(adapter.error_from_response(status, &body));
            }

            phase.advance(GenerationPhase::Streaming);
            let mut deltas = Box::pin(delta_stream(
                response.body,
                Arc::clone(adapter),
                self.options.stream_idle_timeout,
            ));
            while let Some(delta) = deltas.next().await {
                ctx.emit_token(&delta?);
            }
            return Ok(ctx.get_content().to_string());
        }

        let request = adapter.build_request(messages, &options, config);
        log::debug!("[{}] POST {}", adapter.id(), redact_query(&request.url));
        let response = self.with_timeout(self.transport.send(request)).await?;
        if !response.is_success() {
            return Err(adapter.error_from_response(response.status, &response.body));
        }

        let body: Value = serde_json::from_str(&response.body)?;
        let text = adapter.parse_response(&body);
        if ctx.is_streaming() {
            phase.advance(GenerationPhase::Streaming);
            self.options.simulated_stream.replay(&text, ctx).await;
        } else {
            ctx.set_content(text.clone());
        }
        Ok(text)
    }
}

/// Drop the query string so `?key=` never reaches the logs
pub(crate) fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
