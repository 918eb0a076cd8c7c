// Content extraction data models

use serde::{Deserialize, Serialize};

/// Coarse category of an extracted page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Blog,
    News,
    Documentation,
    #[default]
    General,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Blog => "blog",
            ContentType::News => "news",
            ContentType::Documentation => "documentation",
            ContentType::General => "general",
        }
    }
}

/// Output language preference; also used as the detected language of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
    #[default]
    Auto,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Auto => "auto",
        }
    }
}

/// Normalized text plus metadata produced by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub word_count: usize,
    pub language: Language,
}

/// Cloned DOM state handed over by the page host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    pub html: String,
    /// Current text selection, if any
    #[serde(default)]
    pub selection: Option<String>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            html: html.into(),
            selection: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }
}
