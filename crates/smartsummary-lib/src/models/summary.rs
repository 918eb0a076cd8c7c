// Summary data models

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::content::Language;
use super::ai::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Output style; any id other than the built-ins is a custom style id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum SummaryStyle {
    #[default]
    Bullet,
    Paragraph,
    Qa,
    Custom(String),
}

impl SummaryStyle {
    pub fn as_str(&self) -> &str {
        match self {
            SummaryStyle::Bullet => "bullet",
            SummaryStyle::Paragraph => "paragraph",
            SummaryStyle::Qa => "qa",
            SummaryStyle::Custom(id) => id,
        }
    }
}

impl From<String> for SummaryStyle {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bullet" => SummaryStyle::Bullet,
            "paragraph" => SummaryStyle::Paragraph,
            "qa" => SummaryStyle::Qa,
            _ => SummaryStyle::Custom(value),
        }
    }
}

impl From<SummaryStyle> for String {
    fn from(value: SummaryStyle) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SummaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length, style and language axes of a summary request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SummarySettings {
    #[serde(default)]
    pub length: SummaryLength,
    #[serde(default)]
    pub style: SummaryStyle,
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Page,
    Selection,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Page => "page",
            SourceType::Selection => "selection",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "page" => Some(SourceType::Page),
            "selection" => Some(SourceType::Selection),
            _ => None,
        }
    }
}

/// Stored summary record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub id: String,
    pub title: String,
    pub content: String,
    pub url: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub word_count: usize,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
}

impl SummaryResult {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
        word_count: usize,
        source_type: SourceType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            url: url.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            word_count,
            source_type,
            ai_provider: None,
            ai_model: None,
        }
    }
}

/// User-defined style entry looked up by `SummaryStyle::Custom` ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStyle {
    pub id: String,
    pub name: String,
    pub description: String,
}
