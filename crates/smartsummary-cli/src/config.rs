// CLI configuration
// Database location, environment overrides and service construction

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use smartsummary_lib::utils::database::get_database_path;
use smartsummary_lib::{
    AIService, AppSettings, Database, ProviderConfig, ProviderId, ServiceOptions, SqliteStorage,
    SummaryStorage,
};

pub const ENV_API_KEY: &str = "SMARTSUMMARY_API_KEY";
pub const ENV_PROVIDER: &str = "SMARTSUMMARY_PROVIDER";
pub const ENV_MODEL: &str = "SMARTSUMMARY_MODEL";
pub const ENV_BASE_URL: &str = "SMARTSUMMARY_BASE_URL";

/// Provider fields taken from the environment for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_key: read(ENV_API_KEY),
            provider: read(ENV_PROVIDER),
            model: read(ENV_MODEL),
            base_url: read(ENV_BASE_URL),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.provider.is_none()
            && self.model.is_none()
            && self.base_url.is_none()
    }

    /// Overlay onto `config`. Switching provider drops the stored model and
    /// endpoint since they belong to the previous provider.
    pub fn apply(&self, mut config: ProviderConfig) -> Result<ProviderConfig> {
        if let Some(provider) = &self.provider {
            let provider = parse_provider(provider)?;
            if provider != config.provider {
                config.provider = provider;
                config.model = None;
                config.base_url = None;
            }
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(config)
    }
}

/// Accepts the registry ids plus `anthropic` as an alias of `claude`
pub fn parse_provider(value: &str) -> Result<ProviderId> {
    let id = ProviderId::new(value);
    match id.as_str() {
        ProviderId::OPENAI | ProviderId::CLAUDE | ProviderId::GEMINI => Ok(id),
        "anthropic" => Ok(ProviderId::claude()),
        other => Err(anyhow!(
            "Unknown provider '{}' (expected openai, claude or gemini)",
            other
        )),
    }
}

/// `--db` when given, else the per-user data directory
pub fn database_path(db: Option<&Path>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path.to_path_buf()),
        None => get_database_path().map_err(|e| anyhow!(e)),
    }
}

pub fn open_storage(db: Option<&Path>) -> Result<SqliteStorage> {
    let path = database_path(db)?;
    log::debug!("Opening database at {:?}", path);
    let database = Database::new(path.clone())
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("Cannot open {}", path.display()))?;
    Ok(SqliteStorage::new(database))
}

/// Stored default provider with the environment laid over it
pub fn resolve_provider(settings: &AppSettings, overrides: &EnvOverrides) -> Result<ProviderConfig> {
    let stored = settings
        .default_provider()
        .cloned()
        .unwrap_or_else(|| ProviderConfig::new("OpenAI", ProviderId::openai(), ""));
    let config = overrides.apply(stored)?;
    if !overrides.is_empty() {
        log::debug!("Provider overridden from environment: {:?}", config);
    }
    Ok(config)
}

pub fn service_options(settings: &AppSettings) -> ServiceOptions {
    let mut options = ServiceOptions::default();
    options.custom_styles = settings
        .custom_styles
        .iter()
        .map(|style| (style.id.clone(), style.description.clone()))
        .collect();
    options
}

pub struct CliContext {
    pub storage: SqliteStorage,
    pub settings: AppSettings,
    pub provider: ProviderConfig,
}

impl CliContext {
    pub fn load(db: Option<&Path>) -> Result<Self> {
        let storage = open_storage(db)?;
        let settings = storage.get_settings().map_err(|e| anyhow!(e))?;
        let provider = resolve_provider(&settings, &EnvOverrides::from_env())?;
        Ok(Self { storage, settings, provider })
    }

    pub fn service(&self) -> AIService {
        AIService::with_options(self.provider.clone(), service_options(&self.settings))
    }
}
