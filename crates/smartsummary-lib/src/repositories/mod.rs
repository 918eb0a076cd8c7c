// Repository Layer
// Persistence of settings, summary history and chat sessions

pub mod storage_repo;

use serde::{Deserialize, Serialize};

use crate::models::{AppSettings, ChatSession, SummaryResult};

pub use storage_repo::{SqliteStorage, CHAT_RETENTION, SUMMARY_RETENTION};

/// Version tag written into exports
pub const EXPORT_VERSION: &str = "1.0.0";

/// Storage used by hosts to read configuration and keep finished results.
///
/// Errors are context-prefixed strings suitable for logging or display.
pub trait SummaryStorage: Send + Sync {
    /// Stored settings, or defaults when nothing was saved yet
    fn get_settings(&self) -> Result<AppSettings, String>;
    fn save_settings(&self, settings: &AppSettings) -> Result<(), String>;

    /// Newest first
    fn get_summaries(&self) -> Result<Vec<SummaryResult>, String>;
    fn get_summary(&self, id: &str) -> Result<Option<SummaryResult>, String>;
    /// Stores `summary` as the newest entry and drops entries beyond the retention limit
    fn save_summary(&self, summary: &SummaryResult) -> Result<(), String>;
    /// Returns whether a summary was removed
    fn delete_summary(&self, id: &str) -> Result<bool, String>;

    /// Newest first
    fn get_chats(&self) -> Result<Vec<ChatSession>, String>;
    fn get_chat(&self, id: &str) -> Result<Option<ChatSession>, String>;
    /// Replaces an existing session with the same id in place, otherwise adds it as newest
    fn save_chat(&self, chat: &ChatSession) -> Result<(), String>;
    fn delete_chat(&self, id: &str) -> Result<bool, String>;

    /// Pretty-printed JSON document of everything stored
    fn export_data(&self) -> Result<String, String>;
    /// Replaces each section present in the document; absent sections are left alone
    fn import_data(&self, json: &str) -> Result<(), String>;
    fn clear_all(&self) -> Result<(), String>;
}

/// Export document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub settings: Option<AppSettings>,
    #[serde(default)]
    pub summaries: Option<Vec<SummaryResult>>,
    #[serde(default)]
    pub chats: Option<Vec<ChatSession>>,
}
