// Selector-based fallbacks

use scraper::Selector;

use super::dom::{aggregate_paragraphs, parse_selectors, visible_text, NoiseFilter};
use super::{Document, ExtractionStrategy};

/// Containers tried in priority order
pub const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".content",
    "#content",
    ".main-content",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".markdown-body",
    ".post-message",
    ".answer",
    ".wiki-content",
    ".container",
    ".wrapper",
    "body",
];

/// Text must be longer than this to be accepted
const MIN_SELECTOR_TEXT_CHARS: usize = 200;

/// First well-known container with enough text
pub struct SelectorListExtractor {
    selectors: Vec<Selector>,
    noise: NoiseFilter,
}

impl Default for SelectorListExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorListExtractor {
    pub fn new() -> Self {
        Self {
            selectors: parse_selectors(CONTENT_SELECTORS),
            noise: NoiseFilter::base(),
        }
    }
}

impl ExtractionStrategy for SelectorListExtractor {
    fn name(&self) -> &str {
        "selector-list"
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            doc.html()
                .select(selector)
                .map(|el| aggregate_paragraphs(el, &self.noise))
                .find(|text| text.trim().chars().count() > MIN_SELECTOR_TEXT_CHARS)
        })
    }
}

/// Whatever the body says once page chrome is stripped
pub struct BodyFallbackExtractor {
    noise: NoiseFilter,
}

impl Default for BodyFallbackExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyFallbackExtractor {
    pub fn new() -> Self {
        Self {
            noise: NoiseFilter::aggressive(),
        }
    }
}

impl ExtractionStrategy for BodyFallbackExtractor {
    fn name(&self) -> &str {
        "body-fallback"
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        let text = visible_text(doc.body()?, &self.noise);
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_list_needs_long_text() {
        let short = Document::parse("<main><p>Short main text only.</p></main>", "https://a.test");
        assert!(SelectorListExtractor::new().try_extract(&short).is_none());

        let long_text = "A sentence that repeats to make the block long. ".repeat(6);
        let html = format!("<div class=\"markdown-body\"><p>{}</p></div>", long_text);
        let doc = Document::parse(&html, "https://github.com/a/b");
        let text = SelectorListExtractor::new().try_extract(&doc).unwrap();
        assert_eq!(text, long_text.trim());
    }

    #[test]
    fn test_body_fallback_strips_chrome() {
        let doc = Document::parse(
            "<body><header>Site</header><div class=\"ads\">Buy now</div><span>Just text</span><div class=\"comments\">c1</div></body>",
            "https://a.test",
        );
        let text = BodyFallbackExtractor::new().try_extract(&doc).unwrap();
        assert_eq!(text.trim(), "Just text");
    }
}
