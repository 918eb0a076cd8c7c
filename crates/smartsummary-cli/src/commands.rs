// CLI command handlers
// Every handler writes its report to `out`; progress and errors go through the logger

use anyhow::{anyhow, bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use smartsummary_lib::repositories::SummaryStorage;
use smartsummary_lib::services::ai::ProviderAdapter;
use smartsummary_lib::services::extract::ExtractError;
use smartsummary_lib::services::image::{GlyphRasterizer, Rasterizer, WireframeRasterizer};
use smartsummary_lib::utils::app_paths::sanitize_error;
use smartsummary_lib::{
    AIError, AIService, ChatMessage, ChatRole, ChatSession, ContentExtractor, ImageRenderer,
    ImageTemplate, Language, PageSnapshot, ProviderConfig, SourceType, SummaryLength,
    SummaryResult, SummaryStyle,
};

use crate::config::{parse_provider, CliContext};

pub struct SummarizeRequest {
    pub file: PathBuf,
    pub url: Option<String>,
    pub selection: Option<String>,
    pub length: Option<SummaryLength>,
    pub style: Option<SummaryStyle>,
    pub language: Option<Language>,
    pub save: bool,
}

/// AI errors become the short localized message; details only reach the log
fn ai_failure(error: AIError, language: Language) -> anyhow::Error {
    log::error!("[{}] {}", error.code().as_str(), sanitize_error(&error.to_string()));
    anyhow!(error.to_user_message(language))
}

fn storage_failure(error: String) -> anyhow::Error {
    anyhow!(sanitize_error(&error))
}

fn file_url(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn format_time(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn preview(text: &str, max_chars: usize) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > max_chars {
        format!("{}...", line.chars().take(max_chars).collect::<String>())
    } else {
        line.to_string()
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "****".to_string(),
        n => format!("{}****{}", chars[..3].iter().collect::<String>(), chars[n - 4..].iter().collect::<String>()),
    }
}

/// Extract, summarize with streaming output, then store
pub async fn summarize(
    ctx: &CliContext,
    service: &AIService,
    request: SummarizeRequest,
    out: &mut (dyn Write + Send),
) -> Result<SummaryResult> {
    let html = std::fs::read_to_string(&request.file)
        .with_context(|| format!("Failed to read {}", request.file.display()))?;
    let url = request.url.clone().unwrap_or_else(|| file_url(&request.file));
    let mut snapshot = PageSnapshot::new(url, html);
    if let Some(selection) = &request.selection {
        snapshot = snapshot.with_selection(selection.clone());
    }

    let extractor = ContentExtractor::new();
    let (extracted, source_type) = if request.selection.is_some() {
        let content = extractor
            .extract_selected_content(&snapshot)
            .ok_or_else(|| anyhow!("The selection is empty"))?;
        (content, SourceType::Selection)
    } else {
        let content = extractor.extract_page_content(&snapshot).map_err(|e| match e {
            ExtractError::NoContent(_) => anyhow!("No readable text found in {}", request.file.display()),
            other => anyhow!(other),
        })?;
        (content, SourceType::Page)
    };
    log::info!(
        "Extracted '{}' ({} words, {})",
        extracted.title,
        extracted.word_count,
        extracted.content_type.as_str()
    );

    let mut settings = ctx.settings.summary.clone();
    if let Some(length) = request.length {
        settings.length = length;
    }
    if let Some(style) = request.style {
        settings.style = style;
    }
    if let Some(language) = request.language {
        settings.language = language;
    }

    let text = {
        let mut on_chunk = |chunk: &str| {
            let _ = out.write_all(chunk.as_bytes());
            let _ = out.flush();
        };
        service
            .generate_summary(&extracted.content, &settings, source_type, Some(&mut on_chunk))
            .await
            .map_err(|e| ai_failure(e, settings.language))?
    };
    writeln!(out)?;

    let config = service.config().await;
    let mut summary = SummaryResult::new(
        extracted.title,
        text,
        extracted.url,
        extracted.word_count,
        source_type,
    );
    summary.ai_model = config.model.clone().or_else(|| {
        service
            .registry()
            .get(&config.provider)
            .ok()
            .map(|adapter| adapter.default_model().to_string())
    });
    summary.ai_provider = Some(config.provider);

    if request.save {
        ctx.storage.save_summary(&summary).map_err(storage_failure)?;
        log::info!("Summary saved as {}", summary.id);
    }
    Ok(summary)
}

/// One follow-up turn on a stored summary; the session is stored afterwards
pub async fn chat(
    ctx: &CliContext,
    service: &AIService,
    summary_id: &str,
    question: &str,
    session_id: Option<&str>,
    out: &mut (dyn Write + Send),
) -> Result<ChatSession> {
    if question.trim().is_empty() {
        bail!("The question is empty");
    }
    let summary = ctx
        .storage
        .get_summary(summary_id)
        .map_err(storage_failure)?
        .ok_or_else(|| anyhow!("No summary with id {}", summary_id))?;

    let mut session = match session_id {
        Some(id) => ctx
            .storage
            .get_chat(id)
            .map_err(storage_failure)?
            .ok_or_else(|| anyhow!("No chat session with id {}", id))?,
        None => ChatSession::new(summary.title.clone(), Some(summary.content.clone())),
    };
    session.push_message(ChatMessage::user(question.trim()));

    let language = ctx.settings.summary.language;
    let answer = {
        let mut on_chunk = |chunk: &str| {
            let _ = out.write_all(chunk.as_bytes());
            let _ = out.flush();
        };
        service
            .generate_chat_response(session.messages(), session.context(), Some(&mut on_chunk))
            .await
            .map_err(|e| ai_failure(e, language))?
    };
    writeln!(out)?;

    session.push_message(ChatMessage::assistant(answer));
    ctx.storage.save_chat(&session).map_err(storage_failure)?;
    log::info!("Chat session {} saved ({} messages)", session.id, session.messages().len());
    Ok(session)
}

pub async fn validate(ctx: &CliContext, service: &AIService, json: bool, out: &mut dyn Write) -> Result<()> {
    let result = service.validate_connection(&ctx.provider).await;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
        return Ok(());
    }

    let model = ctx.provider.model.as_deref().unwrap_or("(provider default)");
    if result.is_valid {
        writeln!(out, "OK: {} ({}) model {}", ctx.provider.name, ctx.provider.provider, model)?;
    } else {
        writeln!(
            out,
            "FAILED: {} ({}): {}",
            ctx.provider.name,
            ctx.provider.provider,
            result.error.as_deref().unwrap_or("unknown error")
        )?;
    }
    if result.model_supported == Some(false) {
        writeln!(out, "warning: model {} is not in the provider's model list", model)?;
    }
    if let Some(models) = &result.available_models {
        writeln!(out, "available models: {}", models.join(", "))?;
    }
    Ok(())
}

pub fn list_summaries(storage: &dyn SummaryStorage, out: &mut dyn Write) -> Result<()> {
    let summaries = storage.get_summaries().map_err(storage_failure)?;
    if summaries.is_empty() {
        writeln!(out, "No summaries stored")?;
    }
    for s in summaries {
        writeln!(
            out,
            "{}  {}  {:<9}  {}",
            s.id,
            format_time(s.timestamp),
            s.source_type.as_str(),
            preview(&s.title, 60)
        )?;
    }
    Ok(())
}

pub fn show_summary(storage: &dyn SummaryStorage, id: &str, out: &mut dyn Write) -> Result<()> {
    let summary = storage
        .get_summary(id)
        .map_err(storage_failure)?
        .ok_or_else(|| anyhow!("No summary with id {}", id))?;
    writeln!(out, "{}", summary.title)?;
    writeln!(out, "{}", summary.url)?;
    let model = match (&summary.ai_provider, &summary.ai_model) {
        (Some(provider), Some(model)) => format!(" via {}/{}", provider, model),
        (Some(provider), None) => format!(" via {}", provider),
        _ => String::new(),
    };
    writeln!(
        out,
        "{} | {} words | {}{}",
        format_time(summary.timestamp),
        summary.word_count,
        summary.source_type.as_str(),
        model
    )?;
    writeln!(out)?;
    writeln!(out, "{}", summary.content)?;
    Ok(())
}

pub fn delete_summary(storage: &dyn SummaryStorage, id: &str, out: &mut dyn Write) -> Result<()> {
    if !storage.delete_summary(id).map_err(storage_failure)? {
        bail!("No summary with id {}", id);
    }
    writeln!(out, "Deleted summary {}", id)?;
    Ok(())
}

pub fn list_chats(storage: &dyn SummaryStorage, out: &mut dyn Write) -> Result<()> {
    let chats = storage.get_chats().map_err(storage_failure)?;
    if chats.is_empty() {
        writeln!(out, "No chat sessions stored")?;
    }
    for chat in chats {
        writeln!(
            out,
            "{}  {}  {:>3} msgs  {}",
            chat.id,
            format_time(chat.timestamp),
            chat.messages().len(),
            preview(&chat.title, 60)
        )?;
    }
    Ok(())
}

pub fn show_chat(storage: &dyn SummaryStorage, id: &str, out: &mut dyn Write) -> Result<()> {
    let chat = storage
        .get_chat(id)
        .map_err(storage_failure)?
        .ok_or_else(|| anyhow!("No chat session with id {}", id))?;
    writeln!(out, "{}", chat.title)?;
    for message in chat.messages() {
        let who = match message.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "ai",
        };
        writeln!(out, "\n[{}] {}", who, message.content)?;
    }
    Ok(())
}

pub fn delete_chat(storage: &dyn SummaryStorage, id: &str, out: &mut dyn Write) -> Result<()> {
    if !storage.delete_chat(id).map_err(storage_failure)? {
        bail!("No chat session with id {}", id);
    }
    writeln!(out, "Deleted chat session {}", id)?;
    Ok(())
}

pub fn clear(storage: &dyn SummaryStorage, confirmed: bool, out: &mut dyn Write) -> Result<()> {
    if !confirmed {
        bail!("Refusing to clear all data without --yes");
    }
    storage.clear_all().map_err(storage_failure)?;
    writeln!(out, "All data cleared")?;
    Ok(())
}

pub fn export(storage: &dyn SummaryStorage, output: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let json = storage.export_data().map_err(storage_failure)?;
    match output {
        Some(path) => {
            std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
            writeln!(out, "Exported to {}", path.display())?;
        }
        None => writeln!(out, "{}", json)?,
    }
    Ok(())
}

pub fn import(storage: &dyn SummaryStorage, file: &Path, out: &mut dyn Write) -> Result<()> {
    let json = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    storage.import_data(&json).map_err(storage_failure)?;
    let summaries = storage.get_summaries().map_err(storage_failure)?.len();
    let chats = storage.get_chats().map_err(storage_failure)?.len();
    writeln!(out, "Imported {}: {} summaries, {} chats stored", file.display(), summaries, chats)?;
    Ok(())
}

pub struct RenderRequest {
    pub summary_id: String,
    pub template: String,
    pub font: Option<PathBuf>,
    pub bold_font: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub scale: f32,
}

fn rasterizer(request: &RenderRequest) -> Result<Arc<dyn Rasterizer>> {
    let Some(font) = &request.font else {
        log::warn!("No --font given, text is drawn as placeholder bars");
        return Ok(Arc::new(WireframeRasterizer));
    };
    let mut glyphs = GlyphRasterizer::from_file(font)?;
    if let Some(bold) = &request.bold_font {
        let bytes = std::fs::read(bold).with_context(|| format!("Failed to read {}", bold.display()))?;
        glyphs = glyphs.with_bold(bytes)?;
    }
    Ok(Arc::new(glyphs))
}

/// Render a stored summary and write the PNG into `out_dir`; returns the file path
pub fn render(storage: &dyn SummaryStorage, request: &RenderRequest, out: &mut dyn Write) -> Result<PathBuf> {
    if !(request.scale > 0.0) {
        bail!("--scale must be positive");
    }
    let template = ImageTemplate::by_id(&request.template)
        .ok_or_else(|| anyhow!("Unknown template '{}'", request.template))?;
    let summary = storage
        .get_summary(&request.summary_id)
        .map_err(storage_failure)?
        .ok_or_else(|| anyhow!("No summary with id {}", request.summary_id))?;

    let renderer = ImageRenderer::new(rasterizer(request)?).with_pixel_scale(request.scale);
    let image = renderer.render(&summary, &template)?;

    std::fs::create_dir_all(&request.out_dir)
        .with_context(|| format!("Failed to create {}", request.out_dir.display()))?;
    let path = request.out_dir.join(image.file_name(&summary));
    std::fs::write(&path, &image.png).with_context(|| format!("Failed to write {}", path.display()))?;

    writeln!(out, "{} ({}x{})", path.display(), image.width, image.height)?;
    if image.truncated {
        writeln!(out, "note: content was shortened to fit the {} template", template.name)?;
    }
    Ok(path)
}

pub fn list_templates(out: &mut dyn Write) -> Result<()> {
    for template in ImageTemplate::all() {
        writeln!(
            out,
            "{:<12} {}x{}  {}  {}",
            template.style.as_str(),
            template.width,
            template.height,
            template.name,
            template.description
        )?;
    }
    Ok(())
}

pub fn show_config(storage: &dyn SummaryStorage, out: &mut dyn Write) -> Result<()> {
    let settings = storage.get_settings().map_err(storage_failure)?;
    let default_id = settings.default_provider().map(|p| p.id.clone());
    writeln!(out, "Providers:")?;
    for p in &settings.providers {
        let marker = if Some(&p.id) == default_id.as_ref() { "*" } else { " " };
        writeln!(
            out,
            "{} {} [{}] key {} model {}{}",
            marker,
            p.name,
            p.provider,
            mask_key(&p.api_key),
            p.model.as_deref().unwrap_or("(default)"),
            p.base_url.as_deref().map(|u| format!(" endpoint {}", u)).unwrap_or_default()
        )?;
    }
    let summary = &settings.summary;
    writeln!(
        out,
        "Summary defaults: length {} style {} language {}",
        serde_json::to_value(summary.length)?.as_str().unwrap_or("medium"),
        summary.style,
        summary.language.as_str()
    )?;
    if !settings.custom_styles.is_empty() {
        writeln!(out, "Custom styles:")?;
        for style in &settings.custom_styles {
            writeln!(out, "  {} - {}", style.id, style.description)?;
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct ConfigUpdate {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub length: Option<SummaryLength>,
    pub style: Option<SummaryStyle>,
    pub language: Option<Language>,
}

/// Provider fields update the default provider entry. Naming another
/// provider switches the default to that provider's entry, creating it if needed.
pub fn set_config(storage: &dyn SummaryStorage, update: ConfigUpdate, out: &mut dyn Write) -> Result<()> {
    let mut settings = storage.get_settings().map_err(storage_failure)?;

    let touches_provider = update.provider.is_some()
        || update.api_key.is_some()
        || update.model.is_some()
        || update.base_url.is_some();
    if touches_provider {
        let current = settings.default_provider().cloned();
        let mut config = match update.provider.as_deref() {
            Some(name) => {
                let provider = parse_provider(name)?;
                match current.filter(|c| c.provider == provider) {
                    Some(config) => config,
                    None => settings
                        .providers
                        .iter()
                        .find(|p| p.provider == provider)
                        .cloned()
                        .unwrap_or_else(|| {
                            let display = provider_display_name(provider.as_str());
                            ProviderConfig::new(display, provider, "")
                        }),
                }
            }
            None => current.ok_or_else(|| anyhow!("No provider configured; pass --provider"))?,
        };
        if let Some(key) = update.api_key {
            config.api_key = key.trim().to_string();
        }
        if let Some(model) = update.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = update.base_url {
            config = config.with_base_url(base_url);
        }
        writeln!(out, "Default provider: {} [{}]", config.name, config.provider)?;
        settings.set_default_provider(config);
    }

    if let Some(length) = update.length {
        settings.summary.length = length;
    }
    if let Some(style) = update.style {
        settings.summary.style = style;
    }
    if let Some(language) = update.language {
        settings.summary.language = language;
    }

    storage.save_settings(&settings).map_err(storage_failure)?;
    writeln!(out, "Settings saved")?;
    Ok(())
}

fn provider_display_name(id: &str) -> &'static str {
    match id {
        "claude" => "Claude",
        "gemini" => "Gemini",
        _ => "OpenAI",
    }
}
