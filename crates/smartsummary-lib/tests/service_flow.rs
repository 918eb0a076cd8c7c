// End-to-end summary and chat flows against a scripted transport

use serde_json::json;
use std::sync::Arc;

use smartsummary_lib::models::{
    ChatMessage, Language, ProviderConfig, ProviderId, SourceType, SummaryLength, SummarySettings,
    SummaryStyle,
};
use smartsummary_lib::services::ai::{
    summary_cache_key, AIError, AIService, ManualClock, ProviderRegistry, ServiceOptions,
    SimulatedStream, StubReply, StubTransport,
};

const START: i64 = 1_700_000_000_000;

fn service(provider: ProviderId, stub: Arc<StubTransport>) -> (AIService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let options = ServiceOptions {
        simulated_stream: SimulatedStream::instant(),
        ..ServiceOptions::default()
    };
    let service = AIService::with_dependencies(
        ProviderConfig::new("Test", provider, "sk-test"),
        ProviderRegistry::default(),
        stub,
        clock.clone(),
        options,
    );
    (service, clock)
}

fn openai_reply(text: &str) -> StubReply {
    StubReply::json(json!({"choices": [{"message": {"role": "assistant", "content": text}}]}))
}

fn zh_short_bullet() -> SummarySettings {
    SummarySettings {
        length: SummaryLength::Short,
        style: SummaryStyle::Bullet,
        language: Language::Zh,
    }
}

#[tokio::test]
async fn chinese_bullet_summary_scenario() {
    let content = "这是一段测试内容。".repeat(50);
    let settings = zh_short_bullet();
    let stub = Arc::new(StubTransport::with_replies(vec![openai_reply("• 测试要点一\n• 测试要点二")]));
    let (service, _) = service(ProviderId::openai(), stub.clone());

    let text = service
        .generate_summary(&content, &settings, SourceType::Page, None)
        .await
        .unwrap();
    assert_eq!(text, "• 测试要点一\n• 测试要点二");

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let body = requests[0].body.clone().unwrap();
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("简洁的摘要（100-200字）"));
    assert!(prompt.contains("使用要点列表的形式"));
    assert!(prompt.contains("用中文回复"));

    let key = summary_cache_key(&content, &settings, SourceType::Page);
    assert_eq!(key, summary_cache_key(&content, &settings, SourceType::Page));
    assert!(key.starts_with("summary_"));

    let again = service
        .generate_summary(&content, &settings, SourceType::Page, None)
        .await
        .unwrap();
    assert_eq!(again, text);
    assert_eq!(stub.request_count(), 1);
}

#[tokio::test]
async fn cache_replay_is_idempotent_and_streams() {
    let stub = Arc::new(StubTransport::with_replies(vec![openai_reply("cached answer text")]));
    let (service, _) = service(ProviderId::openai(), stub.clone());
    let settings = SummarySettings::default();

    let first = service
        .generate_summary("article body", &settings, SourceType::Page, None)
        .await
        .unwrap();

    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |c: &str| chunks.push(c.to_string());
    let second = service
        .generate_summary("article body", &settings, SourceType::Page, Some(&mut on_chunk))
        .await
        .unwrap();

    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(chunks.concat(), second);
    assert!(chunks.len() > 1);
    assert_eq!(stub.request_count(), 1);
}

#[tokio::test]
async fn different_settings_miss_the_cache() {
    let stub = Arc::new(StubTransport::with_replies(vec![openai_reply("one"), openai_reply("two")]));
    let (service, _) = service(ProviderId::openai(), stub.clone());

    let a = service
        .generate_summary("same text", &SummarySettings::default(), SourceType::Page, None)
        .await
        .unwrap();
    let b = service
        .generate_summary("same text", &SummarySettings::default(), SourceType::Selection, None)
        .await
        .unwrap();

    assert_eq!((a.as_str(), b.as_str()), ("one", "two"));
    assert_eq!(stub.request_count(), 2);
}

#[tokio::test]
async fn native_stream_skips_malformed_line() {
    let stub = Arc::new(StubTransport::with_replies(vec![StubReply::sse([
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        "data: {not json\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
        "data: [DONE]\n\n",
    ])]));
    let (service, _) = service(ProviderId::openai(), stub);

    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |c: &str| chunks.push(c.to_string());
    let text = service
        .generate_summary("content", &SummarySettings::default(), SourceType::Page, Some(&mut on_chunk))
        .await
        .unwrap();

    assert_eq!(text, "Hello world");
    assert_eq!(chunks, vec!["Hello", " world"]);
}

#[tokio::test]
async fn anthropic_stream_completeness() {
    let stub = Arc::new(StubTransport::with_replies(vec![StubReply::sse([
        "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"第一\"}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"第二\"}}\n\n",
        "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
    ])]));
    let (service, _) = service(ProviderId::claude(), stub.clone());

    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |c: &str| chunks.push(c.to_string());
    let text = service
        .generate_summary("内容", &SummarySettings::default(), SourceType::Page, Some(&mut on_chunk))
        .await
        .unwrap();

    assert_eq!(text, "第一第二");
    assert_eq!(chunks.concat(), text);
    assert_eq!(stub.requests()[0].header_value("anthropic-version"), Some("2023-06-01"));
}

#[tokio::test]
async fn gemini_simulated_stream_completeness() {
    let answer = "Gemini does not stream here, so the full answer is replayed in slices.";
    let stub = Arc::new(StubTransport::with_replies(vec![StubReply::json(json!({
        "candidates": [{"content": {"parts": [{"text": answer}]}}]
    }))]));
    let (service, _) = service(ProviderId::gemini(), stub.clone());

    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |c: &str| chunks.push(c.to_string());
    let text = service
        .generate_summary("content", &SummarySettings::default(), SourceType::Page, Some(&mut on_chunk))
        .await
        .unwrap();

    assert_eq!(text, answer);
    assert_eq!(chunks.concat(), answer);
    assert!(chunks.len() > 1);
    assert!(stub.requests()[0].url.contains(":generateContent?key="));
}

#[tokio::test]
async fn thirty_first_call_is_rate_limited_without_io() {
    let replies = (0..30).map(|i| openai_reply(&format!("summary {}", i)));
    let stub = Arc::new(StubTransport::with_replies(replies));
    let (service, clock) = service(ProviderId::openai(), stub.clone());
    let settings = SummarySettings::default();

    for i in 0..30 {
        service
            .generate_summary(&format!("content {}", i), &settings, SourceType::Page, None)
            .await
            .unwrap();
        clock.advance(1_000);
    }
    assert_eq!(stub.request_count(), 30);

    let err = service
        .generate_summary("content 30", &settings, SourceType::Page, None)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match err {
        AIError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 30),
        other => panic!("expected rate limit, got {:?}", other),
    }
    assert_eq!(stub.request_count(), 30);
}

#[tokio::test]
async fn chat_turn_uses_context_and_history() {
    let stub = Arc::new(StubTransport::with_replies(vec![openai_reply("It covers ownership.")]));
    let (service, _) = service(ProviderId::openai(), stub.clone());
    let history = vec![ChatMessage::user("What is this article about?")];

    let answer = service
        .generate_chat_response(&history, Some("Summary: Rust ownership"), None)
        .await
        .unwrap();
    assert_eq!(answer, "It covers ownership.");

    let body = stub.requests()[0].body.clone().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert!(messages[0]["content"].as_str().unwrap().contains("Summary: Rust ownership"));
    assert_eq!(messages[1]["content"], "What is this article about?");
}

#[tokio::test]
async fn provider_error_message_surfaces() {
    let stub = Arc::new(StubTransport::with_replies(vec![StubReply::status(
        401,
        r#"{"error":{"message":"Incorrect API key provided"}}"#,
    )]));
    let (service, _) = service(ProviderId::openai(), stub);

    let err = service
        .generate_summary("content", &SummarySettings::default(), SourceType::Page, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AIError::AuthFailed(_)));
    assert_eq!(err.to_string(), "Incorrect API key provided");
    assert!(!err.is_retryable());
}
