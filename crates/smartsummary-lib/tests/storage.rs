// Persistence across reopen, and the extract -> summarize -> store -> render pipeline

use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

use smartsummary_lib::models::{ChatMessage, ChatSession, PageSnapshot, ProviderConfig, ProviderId, SourceType, SummaryResult};
use smartsummary_lib::repositories::{SqliteStorage, SummaryStorage};
use smartsummary_lib::services::ai::{AIService, ManualClock, ProviderRegistry, ServiceOptions, SimulatedStream, StubReply, StubTransport};
use smartsummary_lib::services::extract::ContentExtractor;
use smartsummary_lib::services::image::{ImageRenderer, WireframeRasterizer};
use smartsummary_lib::utils::database::Database;

#[test]
fn data_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("smartsummary.db");

    let summary = SummaryResult::new("Title", "• point", "https://example.com", 2, SourceType::Page);
    let mut chat = ChatSession::new("Title", Some("• point".to_string()));
    chat.push_message(ChatMessage::user("why?"));
    {
        let storage = SqliteStorage::new(Database::new(path.clone()).unwrap());
        let mut settings = storage.get_settings().unwrap();
        settings.set_default_provider(ProviderConfig::new("Gemini", ProviderId::gemini(), "g-key"));
        storage.save_settings(&settings).unwrap();
        storage.save_summary(&summary).unwrap();
        storage.save_chat(&chat).unwrap();
    }

    let storage = SqliteStorage::new(Database::new(path).unwrap());
    let settings = storage.get_settings().unwrap();
    assert_eq!(settings.default_provider().unwrap().provider, ProviderId::gemini());
    assert_eq!(storage.get_summaries().unwrap(), vec![summary]);
    assert_eq!(storage.get_chat(&chat.id).unwrap(), Some(chat));
}

#[tokio::test]
async fn page_to_stored_summary_to_image() {
    let dir = tempdir().unwrap();
    let storage = SqliteStorage::new(Database::new(dir.path().join("pipeline.db")).unwrap());

    let snapshot = PageSnapshot::new(
        "https://example.com/article/async",
        "<html><head><title>Async Rust</title></head><body><article>\
         <p>Futures in Rust are lazy and do nothing until they are polled by an executor.</p>\
         <p>Tokio provides a multi-threaded runtime, timers, and asynchronous I/O primitives.</p>\
         </article></body></html>",
    );
    let extracted = ContentExtractor::new().extract_page_content(&snapshot).unwrap();

    let stub = Arc::new(StubTransport::with_replies(vec![StubReply::json(json!({
        "choices": [{"message": {"content": "- **Futures** are lazy\n- Tokio runs them"}}]
    }))]));
    let config = ProviderConfig::new("OpenAI", ProviderId::openai(), "sk-test").with_model("gpt-4o-mini");
    let service = AIService::with_dependencies(
        config.clone(),
        ProviderRegistry::default(),
        stub,
        Arc::new(ManualClock::new(1_700_000_000_000)),
        ServiceOptions { simulated_stream: SimulatedStream::instant(), ..ServiceOptions::default() },
    );

    let settings = storage.get_settings().unwrap().summary;
    let text = service
        .generate_summary(&extracted.content, &settings, SourceType::Page, None)
        .await
        .unwrap();

    let mut summary = SummaryResult::new(
        extracted.title.clone(),
        text,
        extracted.url.clone(),
        extracted.word_count,
        SourceType::Page,
    );
    summary.ai_provider = Some(config.provider.clone());
    summary.ai_model = config.model.clone();
    storage.save_summary(&summary).unwrap();

    let stored = storage.get_summary(&summary.id).unwrap().unwrap();
    assert_eq!(stored.title, "Async Rust");
    assert_eq!(stored.ai_model.as_deref(), Some("gpt-4o-mini"));

    let rendered = ImageRenderer::new(Arc::new(WireframeRasterizer))
        .with_pixel_scale(1.0)
        .render_by_id(&stored, "xiaohongshu")
        .unwrap();
    assert_eq!(rendered.width, 1080);
    assert!(rendered.height >= 400);
    assert!(rendered.html.contains("• <strong>Futures</strong> are lazy"));
    assert_eq!(&rendered.png[1..4], b"PNG");
}
