// Response cache
// In-memory TTL cache keyed by operation, content and request settings

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::{OperationKind, SourceType, SummarySettings};

/// Default time-to-live: one hour
pub const DEFAULT_CACHE_TTL_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub content: String,
    /// Insertion time, epoch milliseconds
    pub timestamp: i64,
}

/// Settings part of a summary cache key
#[derive(Debug, Serialize)]
pub struct SummaryCacheInput<'a> {
    pub settings: &'a SummarySettings,
    pub source_type: SourceType,
}

fn short_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)[..16].to_string()
}

/// Deterministic cache key
///
/// `settings` goes through `serde_json::Value`, whose object map keeps keys
/// sorted, so field order never changes the key.
pub fn cache_key(operation: OperationKind, content: &str, settings: &impl Serialize) -> String {
    let settings_json = serde_json::to_value(settings)
        .map(|v| v.to_string())
        .unwrap_or_default();
    format!(
        "{}_{}_{}",
        operation.as_str(),
        short_digest(content.as_bytes()),
        short_digest(settings_json.as_bytes())
    )
}

/// Key used by `generate_summary`
pub fn summary_cache_key(content: &str, settings: &SummarySettings, source_type: SourceType) -> String {
    cache_key(
        OperationKind::Summary,
        content,
        &SummaryCacheInput { settings, source_type },
    )
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl_ms: i64,
    entries: HashMap<String, CacheEntry>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_MS)
    }
}

impl ResponseCache {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl_ms,
            entries: HashMap::new(),
        }
    }

    /// Fresh entry content; an expired entry is evicted
    pub fn get(&mut self, key: &str, now: i64) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) if now - entry.timestamp < self.ttl_ms => return Some(entry.content.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&mut self, key: String, content: String, now: i64) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                content,
                timestamp: now,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, SummaryLength, SummaryStyle};

    fn settings() -> SummarySettings {
        SummarySettings {
            length: SummaryLength::Short,
            style: SummaryStyle::Bullet,
            language: Language::Zh,
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = summary_cache_key("内容", &settings(), SourceType::Page);
        let b = summary_cache_key("内容", &settings(), SourceType::Page);
        assert_eq!(a, b);
        assert!(a.starts_with("summary_"));
        assert_eq!(a.len(), "summary_".len() + 16 + 1 + 16);
    }

    #[test]
    fn test_key_changes_with_inputs() {
        let base = summary_cache_key("内容", &settings(), SourceType::Page);
        assert_ne!(base, summary_cache_key("内容!", &settings(), SourceType::Page));
        assert_ne!(base, summary_cache_key("内容", &settings(), SourceType::Selection));
        let mut other = settings();
        other.length = SummaryLength::Long;
        assert_ne!(base, summary_cache_key("内容", &other, SourceType::Page));
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut cache = ResponseCache::new(1_000);
        cache.insert("k".to_string(), "v".to_string(), 0);
        assert_eq!(cache.get("k", 999), Some("v".to_string()));
        assert_eq!(cache.get("k", 1_000), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_overwrites() {
        let mut cache = ResponseCache::default();
        cache.insert("k".to_string(), "old".to_string(), 0);
        cache.insert("k".to_string(), "new".to_string(), 10);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k", 20), Some("new".to_string()));
    }
}
