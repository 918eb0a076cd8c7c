// Application settings model
// Persisted as one JSON value by the settings repository

use serde::{Deserialize, Serialize};

use super::ai::{ProviderConfig, ProviderId};
use super::summary::{CustomStyle, SummarySettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub font_size: FontSize,
}

/// Id of the provider entry present in fresh settings
pub const DEFAULT_PROVIDER_ID: &str = "default-openai";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub default_provider_id: Option<String>,
    #[serde(default)]
    pub summary: SummarySettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub custom_styles: Vec<CustomStyle>,
}

impl Default for AppSettings {
    fn default() -> Self {
        let mut openai = ProviderConfig::new("OpenAI", ProviderId::openai(), "");
        openai.id = DEFAULT_PROVIDER_ID.to_string();
        openai.is_default = true;
        Self {
            default_provider_id: Some(openai.id.clone()),
            providers: vec![openai],
            summary: SummarySettings::default(),
            ui: UiSettings::default(),
            custom_styles: Vec::new(),
        }
    }
}

impl AppSettings {
    /// Provider marked as default, else the one named by `default_provider_id`,
    /// else the first configured provider
    pub fn default_provider(&self) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.is_default)
            .or_else(|| {
                self.default_provider_id
                    .as_deref()
                    .and_then(|id| self.providers.iter().find(|p| p.id == id))
            })
            .or_else(|| self.providers.first())
    }

    /// Insert or replace a provider config and make it the default
    pub fn set_default_provider(&mut self, config: ProviderConfig) {
        for p in self.providers.iter_mut() {
            p.is_default = false;
        }
        let mut config = config;
        config.is_default = true;
        self.default_provider_id = Some(config.id.clone());
        match self.providers.iter_mut().find(|p| p.id == config.id) {
            Some(existing) => *existing = config,
            None => self.providers.push(config),
        }
    }

    pub fn custom_style(&self, id: &str) -> Option<&CustomStyle> {
        self.custom_styles.iter().find(|s| s.id == id)
    }
}
