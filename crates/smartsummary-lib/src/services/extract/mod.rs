// Content Extraction Module
//
// Turns an HTML snapshot into normalized text plus metadata by running an
// ordered chain of strategies; the first one that yields text wins.

pub mod dom;
pub mod readability;
pub mod selectors;
pub mod site;
pub mod text;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

pub use readability::ReadabilityExtractor;
pub use selectors::{BodyFallbackExtractor, SelectorListExtractor};
pub use site::{ThreadExtractor, ThreadSite};
pub use text::{clean_content, count_words, detect_content_type, detect_language, MAX_CONTENT_CHARS};

use crate::models::{ContentType, ExtractedContent, PageSnapshot};

const UNKNOWN_PAGE_TITLE: &str = "未知页面";
const SELECTION_TITLE: &str = "选中内容";

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No readable content found on {0}")]
    NoContent(String),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Parsed page plus its URL
pub struct Document {
    html: Html,
    url: Option<Url>,
}

impl Document {
    pub fn parse(html: &str, url: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            url: Url::parse(url).ok(),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn host(&self) -> Option<&str> {
        self.url.as_ref().and_then(|u| u.host_str())
    }

    /// First element matching `css`
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.html.select(&selector).next()
    }

    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.select_first("body")
    }

    /// Trimmed `<title>` text
    pub fn title(&self) -> Option<String> {
        self.select_first("title")
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// `content` of `<meta name="...">`
    pub fn meta(&self, name: &str) -> Option<String> {
        let selector = Selector::parse("meta[name]").ok()?;
        self.html
            .select(&selector)
            .find(|m| {
                m.value()
                    .attr("name")
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .and_then(|m| m.value().attr("content"))
            .map(str::to_string)
    }
}

/// One way of finding the main text of a page
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Raw text, or `None` when this strategy does not apply
    fn try_extract(&self, doc: &Document) -> Option<String>;
}

/// Runs the strategy chain and post-processes the result
pub struct ContentExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(ThreadExtractor::default()),
            Box::new(ReadabilityExtractor::new()),
            Box::new(SelectorListExtractor::new()),
            Box::new(BodyFallbackExtractor::new()),
        ])
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Extract the main content of a page
    pub fn extract_page_content(&self, snapshot: &PageSnapshot) -> ExtractResult<ExtractedContent> {
        let doc = Document::parse(&snapshot.html, &snapshot.url);
        let title = snapshot
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| doc.title())
            .unwrap_or_else(|| UNKNOWN_PAGE_TITLE.to_string());

        let raw = self
            .strategies
            .iter()
            .find_map(|strategy| {
                let text = strategy
                    .try_extract(&doc)
                    .filter(|t| !t.trim().is_empty())?;
                log::debug!("Content extracted by '{}' ({} chars)", strategy.name(), text.len());
                Some(text)
            })
            .unwrap_or_default();

        let content = clean_content(&raw);
        if content.is_empty() {
            log::warn!("No content extracted from {}", snapshot.url);
            return Err(ExtractError::NoContent(snapshot.url.clone()));
        }

        Ok(ExtractedContent {
            title,
            content_type: detect_content_type(&content, &snapshot.url),
            word_count: count_words(&content),
            language: detect_language(&content),
            url: snapshot.url.clone(),
            content,
        })
    }

    /// Current selection as content; `None` without a non-blank selection
    pub fn extract_selected_content(&self, snapshot: &PageSnapshot) -> Option<ExtractedContent> {
        let selection = snapshot.selection.as_deref()?.trim();
        if selection.is_empty() {
            return None;
        }
        let content = clean_content(selection);
        Some(ExtractedContent {
            title: SELECTION_TITLE.to_string(),
            url: snapshot.url.clone(),
            content_type: ContentType::General,
            word_count: count_words(&content),
            language: detect_language(&content),
            content,
        })
    }

    pub fn has_selection(snapshot: &PageSnapshot) -> bool {
        snapshot
            .selection
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;

    #[test]
    fn test_selection_extraction() {
        let extractor = ContentExtractor::new();
        let snapshot = PageSnapshot::new("https://a.test/x", "<p>ignored</p>")
            .with_selection("  选中的   一段文字  ");
        let content = extractor.extract_selected_content(&snapshot).unwrap();
        assert_eq!(content.title, "选中内容");
        assert_eq!(content.content, "选中的 一段文字");
        assert_eq!(content.content_type, ContentType::General);
        assert_eq!(content.language, Language::Zh);
    }

    #[test]
    fn test_blank_selection_is_none() {
        let extractor = ContentExtractor::new();
        let blank = PageSnapshot::new("https://a.test", "").with_selection(" \n\t ");
        assert!(extractor.extract_selected_content(&blank).is_none());
        assert!(!ContentExtractor::has_selection(&blank));
        let none = PageSnapshot::new("https://a.test", "");
        assert!(extractor.extract_selected_content(&none).is_none());
    }

    #[test]
    fn test_title_fallbacks() {
        let extractor = ContentExtractor::new();
        let html = "<html><head><title> Doc Title </title></head><body><p>Some body text for the page.</p></body></html>";
        let page = extractor.extract_page_content(&PageSnapshot::new("https://a.test", html)).unwrap();
        assert_eq!(page.title, "Doc Title");

        let untitled = "<html><body><p>Some body text for the page.</p></body></html>";
        let page = extractor.extract_page_content(&PageSnapshot::new("https://a.test", untitled)).unwrap();
        assert_eq!(page.title, "未知页面");
    }

    #[test]
    fn test_empty_page_is_error() {
        let extractor = ContentExtractor::new();
        let result = extractor.extract_page_content(&PageSnapshot::new("https://a.test", "<html><body><script>x()</script></body></html>"));
        assert!(matches!(result, Err(ExtractError::NoContent(_))));
    }

    #[test]
    fn test_document_meta_and_host() {
        let doc = Document::parse(
            "<html><head><meta name=\"Generator\" content=\"Discourse 3.2\"></head></html>",
            "https://linux.do/t/topic/1",
        );
        assert_eq!(doc.meta("generator").as_deref(), Some("Discourse 3.2"));
        assert_eq!(doc.host(), Some("linux.do"));
    }

    #[test]
    fn test_default_chain_order() {
        assert_eq!(
            ContentExtractor::new().strategy_names(),
            vec!["thread", "readability", "selector-list", "body-fallback"]
        );
    }
}
