// Storage Repository
// SQLite-backed implementation of `SummaryStorage`

use rusqlite::{params, Connection, OptionalExtension};

use super::{ExportData, SummaryStorage, EXPORT_VERSION};
use crate::models::{AppSettings, ChatMessage, ChatRole, ChatSession, ProviderId, SourceType, SummaryResult};
use crate::utils::database::Database;

/// Newest summaries kept
pub const SUMMARY_RETENTION: usize = 100;
/// Newest chat sessions kept
pub const CHAT_RETENTION: usize = 50;

const SETTINGS_KEY: &str = "settings";

/// Repository for settings, summaries and chats
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

// ============================================================================
// Row helpers
// ============================================================================

struct SummaryRow {
    id: String,
    title: String,
    content: String,
    url: String,
    timestamp: i64,
    word_count: i64,
    source_type: String,
    ai_provider: Option<String>,
    ai_model: Option<String>,
}

impl SummaryRow {
    const COLUMNS: &'static str =
        "id, title, content, url, timestamp, word_count, source_type, ai_provider, ai_model";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            url: row.get(3)?,
            timestamp: row.get(4)?,
            word_count: row.get(5)?,
            source_type: row.get(6)?,
            ai_provider: row.get(7)?,
            ai_model: row.get(8)?,
        })
    }

    fn into_summary(self) -> Result<SummaryResult, String> {
        let source_type = SourceType::parse(&self.source_type)
            .ok_or_else(|| format!("Invalid source type for summary {}: {}", self.id, self.source_type))?;
        Ok(SummaryResult {
            id: self.id,
            title: self.title,
            content: self.content,
            url: self.url,
            timestamp: self.timestamp,
            word_count: self.word_count.max(0) as usize,
            source_type,
            ai_provider: self.ai_provider.map(ProviderId::new),
            ai_model: self.ai_model,
        })
    }
}

struct ChatSessionRow {
    id: String,
    title: String,
    context: Option<String>,
    timestamp: i64,
}

fn next_seq(conn: &Connection, table: &str) -> Result<i64, String> {
    conn.query_row(&format!("SELECT COALESCE(MAX(seq), 0) + 1 FROM {}", table), [], |row| row.get(0))
        .map_err(|e| format!("Failed to allocate sequence for {}: {}", table, e))
}

fn read_settings(conn: &Connection) -> Result<AppSettings, String> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![SETTINGS_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| format!("Failed to get settings: {}", e))?;

    match value {
        Some(json) => serde_json::from_str(&json).map_err(|e| format!("Failed to parse settings: {}", e)),
        None => Ok(AppSettings::default()),
    }
}

fn write_settings(conn: &Connection, settings: &AppSettings) -> Result<(), String> {
    let json = serde_json::to_string(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    conn.execute(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        params![SETTINGS_KEY, json],
    )
    .map_err(|e| format!("Failed to save settings: {}", e))?;
    Ok(())
}

fn insert_summary(conn: &Connection, summary: &SummaryResult, seq: i64) -> Result<(), String> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO summaries
            (id, seq, title, content, url, timestamp, word_count, source_type, ai_provider, ai_model)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            summary.id,
            seq,
            summary.title,
            summary.content,
            summary.url,
            summary.timestamp,
            summary.word_count as i64,
            summary.source_type.as_str(),
            summary.ai_provider.as_ref().map(|p| p.as_str()),
            summary.ai_model,
        ],
    )
    .map_err(|e| format!("Failed to save summary: {}", e))?;
    Ok(())
}

fn upsert_chat(conn: &Connection, chat: &ChatSession, seq: i64) -> Result<(), String> {
    conn.execute(
        r#"
        INSERT INTO chat_sessions (id, seq, title, context, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            context = excluded.context,
            timestamp = excluded.timestamp
        "#,
        params![chat.id, seq, chat.title, chat.context(), chat.timestamp],
    )
    .map_err(|e| format!("Failed to save chat: {}", e))?;

    conn.execute("DELETE FROM chat_messages WHERE session_id = ?1", params![chat.id])
        .map_err(|e| format!("Failed to replace chat messages: {}", e))?;

    let mut stmt = conn
        .prepare(
            r#"
            INSERT INTO chat_messages (session_id, position, id, role, content, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .map_err(|e| format!("Failed to prepare statement: {}", e))?;
    for (position, message) in chat.messages().iter().enumerate() {
        stmt.execute(params![
            chat.id,
            position as i64,
            message.id,
            message.role.as_str(),
            message.content,
            message.timestamp,
        ])
        .map_err(|e| format!("Failed to save chat message: {}", e))?;
    }
    Ok(())
}

fn load_messages(conn: &Connection, session_id: &str) -> Result<Vec<ChatMessage>, String> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, role, content, timestamp
            FROM chat_messages
            WHERE session_id = ?1
            ORDER BY position ASC
            "#,
        )
        .map_err(|e| format!("Failed to prepare statement: {}", e))?;

    let rows = stmt
        .query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(|e| format!("Failed to query chat messages: {}", e))?;

    let mut messages = Vec::new();
    for row in rows {
        let (id, role, content, timestamp) = row.map_err(|e| format!("Failed to read chat message: {}", e))?;
        let role = ChatRole::parse(&role).ok_or_else(|| format!("Invalid chat role: {}", role))?;
        messages.push(ChatMessage { id, content, role, timestamp });
    }
    Ok(messages)
}

fn session_from_row(conn: &Connection, row: ChatSessionRow) -> Result<ChatSession, String> {
    let messages = load_messages(conn, &row.id)?;
    Ok(ChatSession::restore(row.id, row.title, row.context, messages, row.timestamp))
}

fn prune(conn: &Connection, table: &str, keep: usize) -> Result<usize, String> {
    conn.execute(
        &format!(
            "DELETE FROM {table} WHERE id NOT IN (SELECT id FROM {table} ORDER BY seq DESC LIMIT ?1)",
            table = table
        ),
        params![keep as i64],
    )
    .map_err(|e| format!("Failed to prune {}: {}", table, e))
}

fn replace_summaries(conn: &Connection, summaries: &[SummaryResult]) -> Result<(), String> {
    conn.execute("DELETE FROM summaries", [])
        .map_err(|e| format!("Failed to clear summaries: {}", e))?;
    let kept = &summaries[..summaries.len().min(SUMMARY_RETENTION)];
    for (index, summary) in kept.iter().enumerate() {
        insert_summary(conn, summary, (kept.len() - index) as i64)?;
    }
    Ok(())
}

fn replace_chats(conn: &Connection, chats: &[ChatSession]) -> Result<(), String> {
    conn.execute("DELETE FROM chat_sessions", [])
        .map_err(|e| format!("Failed to clear chats: {}", e))?;
    let kept = &chats[..chats.len().min(CHAT_RETENTION)];
    for (index, chat) in kept.iter().enumerate() {
        upsert_chat(conn, chat, (kept.len() - index) as i64)?;
    }
    Ok(())
}

// ============================================================================
// SummaryStorage
// ============================================================================

impl SummaryStorage for SqliteStorage {
    fn get_settings(&self) -> Result<AppSettings, String> {
        self.db.with_connection(read_settings)
    }

    fn save_settings(&self, settings: &AppSettings) -> Result<(), String> {
        self.db.with_connection(|conn| write_settings(conn, settings))
    }

    fn get_summaries(&self) -> Result<Vec<SummaryResult>, String> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM summaries ORDER BY seq DESC",
                    SummaryRow::COLUMNS
                ))
                .map_err(|e| format!("Failed to prepare statement: {}", e))?;

            let rows = stmt
                .query_map([], SummaryRow::from_row)
                .map_err(|e| format!("Failed to query summaries: {}", e))?;

            rows.map(|row| {
                row.map_err(|e| format!("Failed to read summary: {}", e))?
                    .into_summary()
            })
            .collect()
        })
    }

    fn get_summary(&self, id: &str) -> Result<Option<SummaryResult>, String> {
        self.db.with_connection(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM summaries WHERE id = ?1", SummaryRow::COLUMNS),
                    params![id],
                    SummaryRow::from_row,
                )
                .optional()
                .map_err(|e| format!("Failed to get summary: {}", e))?;
            row.map(SummaryRow::into_summary).transpose()
        })
    }

    fn save_summary(&self, summary: &SummaryResult) -> Result<(), String> {
        self.db.with_transaction(|conn| {
            let seq = next_seq(conn, "summaries")?;
            insert_summary(conn, summary, seq)?;
            let pruned = prune(conn, "summaries", SUMMARY_RETENTION)?;
            if pruned > 0 {
                log::debug!("Pruned {} old summaries", pruned);
            }
            Ok(())
        })
    }

    fn delete_summary(&self, id: &str) -> Result<bool, String> {
        self.db.with_connection(|conn| {
            let affected = conn
                .execute("DELETE FROM summaries WHERE id = ?1", params![id])
                .map_err(|e| format!("Failed to delete summary: {}", e))?;
            Ok(affected > 0)
        })
    }

    fn get_chats(&self) -> Result<Vec<ChatSession>, String> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, context, timestamp FROM chat_sessions ORDER BY seq DESC")
                .map_err(|e| format!("Failed to prepare statement: {}", e))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(ChatSessionRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        context: row.get(2)?,
                        timestamp: row.get(3)?,
                    })
                })
                .map_err(|e| format!("Failed to query chats: {}", e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format!("Failed to read chat: {}", e))?;

            rows.into_iter().map(|row| session_from_row(conn, row)).collect()
        })
    }

    fn get_chat(&self, id: &str) -> Result<Option<ChatSession>, String> {
        self.db.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, title, context, timestamp FROM chat_sessions WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(ChatSessionRow {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            context: row.get(2)?,
                            timestamp: row.get(3)?,
                        })
                    },
                )
                .optional()
                .map_err(|e| format!("Failed to get chat: {}", e))?;
            row.map(|row| session_from_row(conn, row)).transpose()
        })
    }

    fn save_chat(&self, chat: &ChatSession) -> Result<(), String> {
        self.db.with_transaction(|conn| {
            let seq = next_seq(conn, "chat_sessions")?;
            upsert_chat(conn, chat, seq)?;
            let pruned = prune(conn, "chat_sessions", CHAT_RETENTION)?;
            if pruned > 0 {
                log::debug!("Pruned {} old chat sessions", pruned);
            }
            Ok(())
        })
    }

    fn delete_chat(&self, id: &str) -> Result<bool, String> {
        self.db.with_connection(|conn| {
            let affected = conn
                .execute("DELETE FROM chat_sessions WHERE id = ?1", params![id])
                .map_err(|e| format!("Failed to delete chat: {}", e))?;
            Ok(affected > 0)
        })
    }

    fn export_data(&self) -> Result<String, String> {
        let data = ExportData {
            version: EXPORT_VERSION.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            settings: Some(self.get_settings()?),
            summaries: Some(self.get_summaries()?),
            chats: Some(self.get_chats()?),
        };
        serde_json::to_string_pretty(&data).map_err(|e| format!("Failed to export data: {}", e))
    }

    fn import_data(&self, json: &str) -> Result<(), String> {
        let data: ExportData =
            serde_json::from_str(json).map_err(|e| format!("Failed to import data: invalid format: {}", e))?;

        self.db.with_transaction(|conn| {
            if let Some(settings) = &data.settings {
                write_settings(conn, settings)?;
            }
            if let Some(summaries) = &data.summaries {
                replace_summaries(conn, summaries)?;
            }
            if let Some(chats) = &data.chats {
                replace_chats(conn, chats)?;
            }
            Ok(())
        })?;

        log::info!(
            "Imported data (version {}): settings={}, summaries={}, chats={}",
            if data.version.is_empty() { "unknown" } else { data.version.as_str() },
            data.settings.is_some(),
            data.summaries.as_ref().map_or(0, Vec::len),
            data.chats.as_ref().map_or(0, Vec::len)
        );
        Ok(())
    }

    fn clear_all(&self) -> Result<(), String> {
        self.db.with_transaction(|conn| {
            conn.execute_batch(
                r#"
                DELETE FROM chat_messages;
                DELETE FROM chat_sessions;
                DELETE FROM summaries;
                DELETE FROM settings;
                "#,
            )
            .map_err(|e| format!("Failed to clear data: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderConfig, SummaryStyle};

    fn setup_storage() -> SqliteStorage {
        SqliteStorage::new(Database::new_in_memory().expect("Failed to create test database"))
    }

    fn summary(n: usize) -> SummaryResult {
        let mut summary = SummaryResult::new(
            format!("Title {}", n),
            format!("Content {}", n),
            format!("https://example.com/{}", n),
            n,
            SourceType::Page,
        );
        summary.timestamp = n as i64;
        summary
    }

    fn chat(title: &str) -> ChatSession {
        let mut chat = ChatSession::new(title, Some("context".to_string()));
        chat.push_message(ChatMessage::user("question"));
        chat.push_message(ChatMessage::assistant("answer"));
        chat
    }

    #[test]
    fn test_settings_default_then_roundtrip() {
        let storage = setup_storage();
        assert_eq!(storage.get_settings().unwrap(), AppSettings::default());

        let mut settings = AppSettings::default();
        settings.summary.style = SummaryStyle::Paragraph;
        settings.set_default_provider(ProviderConfig::new("Claude", ProviderId::claude(), "sk-test"));
        storage.save_settings(&settings).unwrap();

        let loaded = storage.get_settings().unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.default_provider().unwrap().provider, ProviderId::claude());
    }

    #[test]
    fn test_summary_roundtrip_with_provider() {
        let storage = setup_storage();
        let mut s = summary(1);
        s.source_type = SourceType::Selection;
        s.ai_provider = Some(ProviderId::gemini());
        s.ai_model = Some("gemini-1.5-flash".to_string());
        storage.save_summary(&s).unwrap();

        assert_eq!(storage.get_summary(&s.id).unwrap(), Some(s.clone()));
        assert_eq!(storage.get_summaries().unwrap(), vec![s]);
        assert!(storage.get_summary("missing").unwrap().is_none());
    }

    #[test]
    fn test_summary_retention_keeps_newest() {
        let storage = setup_storage();
        let all: Vec<SummaryResult> = (0..SUMMARY_RETENTION + 5).map(summary).collect();
        for s in &all {
            storage.save_summary(s).unwrap();
        }

        let stored = storage.get_summaries().unwrap();
        assert_eq!(stored.len(), SUMMARY_RETENTION);
        assert_eq!(stored[0].id, all[all.len() - 1].id);
        assert_eq!(stored[SUMMARY_RETENTION - 1].id, all[5].id);
        assert!(storage.get_summary(&all[0].id).unwrap().is_none());
    }

    #[test]
    fn test_delete_summary() {
        let storage = setup_storage();
        let s = summary(1);
        storage.save_summary(&s).unwrap();

        assert!(storage.delete_summary(&s.id).unwrap());
        assert!(!storage.delete_summary(&s.id).unwrap());
        assert!(storage.get_summaries().unwrap().is_empty());
    }

    #[test]
    fn test_save_chat_replaces_in_place() {
        let storage = setup_storage();
        let mut first = chat("first");
        let second = chat("second");
        storage.save_chat(&first).unwrap();
        storage.save_chat(&second).unwrap();

        first.push_message(ChatMessage::user("follow-up"));
        storage.save_chat(&first).unwrap();

        let chats = storage.get_chats().unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, second.id);
        assert_eq!(chats[1].id, first.id);
        assert_eq!(chats[1].messages().len(), 3);
        assert_eq!(chats[1].messages()[2].content, "follow-up");
        assert_eq!(chats[1].context(), Some("context"));
    }

    #[test]
    fn test_chat_retention_and_delete() {
        let storage = setup_storage();
        let chats: Vec<ChatSession> = (0..CHAT_RETENTION + 3).map(|i| chat(&format!("chat {}", i))).collect();
        for c in &chats {
            storage.save_chat(c).unwrap();
        }
        assert_eq!(storage.get_chats().unwrap().len(), CHAT_RETENTION);
        assert!(storage.get_chat(&chats[0].id).unwrap().is_none());

        let newest = &chats[chats.len() - 1];
        assert!(storage.delete_chat(&newest.id).unwrap());
        assert!(storage.get_chat(&newest.id).unwrap().is_none());

        let orphans: i64 = storage
            .database()
            .with_connection_raw(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1",
                    params![newest.id],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let source = setup_storage();
        let s1 = summary(1);
        let s2 = summary(2);
        source.save_summary(&s1).unwrap();
        source.save_summary(&s2).unwrap();
        source.save_chat(&chat("c")).unwrap();

        let json = source.export_data().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], EXPORT_VERSION);
        assert!(value["timestamp"].as_i64().unwrap() > 0);

        let target = setup_storage();
        target.save_summary(&summary(99)).unwrap();
        target.import_data(&json).unwrap();

        assert_eq!(target.get_summaries().unwrap(), source.get_summaries().unwrap());
        assert_eq!(target.get_chats().unwrap(), source.get_chats().unwrap());
        assert_eq!(target.get_settings().unwrap(), source.get_settings().unwrap());
    }

    #[test]
    fn test_import_keeps_absent_sections() {
        let storage = setup_storage();
        let s = summary(1);
        storage.save_summary(&s).unwrap();

        storage.import_data(r#"{"chats": []}"#).unwrap();
        assert_eq!(storage.get_summaries().unwrap(), vec![s]);

        let err = storage.import_data("not json").unwrap_err();
        assert!(err.contains("invalid format"));
    }

    #[test]
    fn test_clear_all() {
        let storage = setup_storage();
        storage.save_summary(&summary(1)).unwrap();
        storage.save_chat(&chat("c")).unwrap();
        let mut settings = AppSettings::default();
        settings.summary.style = SummaryStyle::Qa;
        storage.save_settings(&settings).unwrap();

        storage.clear_all().unwrap();

        assert!(storage.get_summaries().unwrap().is_empty());
        assert!(storage.get_chats().unwrap().is_empty());
        assert_eq!(storage.get_settings().unwrap(), AppSettings::default());
    }
}
