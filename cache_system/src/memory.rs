//! In-process backend
//!
//! `MemoryBackend` mirrors the subset of Redis semantics the cache layer
//! relies on (`EX` expiry at whole-second resolution, glob `SCAN`) inside the
//! current process. It counts every call and can be switched into a failing
//! state, which makes it the backend of choice for tests.

use crate::backend::{ttl_seconds, CacheBackend, ScanPage};
use crate::errors::{CacheError, CacheResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Open scan cursors kept before the oldest abandoned ones are dropped
const MAX_OPEN_SCANS: usize = 64;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    /// Holds a non-string value, like a Redis hash; `GET` rejects it
    foreign: bool,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory key-value backend with TTL and prefix scan
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    scan_cursors: Mutex<HashMap<u64, String>>,
    next_cursor: AtomicU64,
    calls: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of backend operations issued so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Write a payload verbatim, bypassing serialization
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        self.insert_entry(key, value, false, ttl);
    }

    /// Store a value `GET` cannot read, as Redis does for a key of another type
    pub fn insert_foreign(&self, key: &str, ttl: Duration) {
        self.insert_entry(key, "", true, ttl);
    }

    fn insert_entry(&self, key: &str, value: &str, foreign: bool, ttl: Duration) {
        let entry = MemoryEntry {
            value: value.to_string(),
            foreign,
            expires_at: Instant::now() + ttl,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), entry);
        }
    }

    /// Live keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, entry)| !entry.is_expired(now))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys().iter().any(|k| k == key)
    }

    fn begin(&self, op: &str) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::StoreUnavailable(format!(
                "memory backend refused {}",
                op
            )));
        }
        Ok(())
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, HashMap<String, MemoryEntry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::General("memory backend lock poisoned".into()))
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.begin("GET")?;
        let mut entries = self.lock()?;

        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) if entry.foreign => Err(CacheError::CorruptedEntry {
                key: key.to_string(),
                reason: "WRONGTYPE key holds a non-string value".to_string(),
            }),
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.begin("SET")?;
        let seconds = ttl_seconds(ttl)?;
        let entry = MemoryEntry {
            value: value.to_string(),
            foreign: false,
            expires_at: Instant::now() + Duration::from_secs(seconds),
        };
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        self.begin("DEL")?;
        let now = Instant::now();
        let mut entries = self.lock()?;

        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        self.begin("SCAN")?;
        let now = Instant::now();

        // A cursor resumes after the last key it returned, so keys deleted
        // between pages never shift the remaining ones out of the walk
        let resume_after = if cursor == 0 {
            None
        } else {
            self.scan_cursors
                .lock()
                .map_err(|_| CacheError::General("memory backend lock poisoned".into()))?
                .remove(&cursor)
        };

        let mut matching: Vec<String> = self
            .lock()?
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .filter(|(key, _)| resume_after.as_ref().is_none_or(|last| key.as_str() > last.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        matching.sort();

        let count = count.max(1);
        let has_more = matching.len() > count;
        matching.truncate(count);

        let cursor = match matching.last() {
            Some(last) if has_more => {
                let next = self.next_cursor.fetch_add(1, Ordering::SeqCst) + 1;
                let mut cursors = self
                    .scan_cursors
                    .lock()
                    .map_err(|_| CacheError::General("memory backend lock poisoned".into()))?;
                // Scans abandoned part way never come back for their cursor
                while cursors.len() >= MAX_OPEN_SCANS {
                    let Some(oldest) = cursors.keys().min().copied() else {
                        break;
                    };
                    cursors.remove(&oldest);
                }
                cursors.insert(next, last.clone());
                next
            }
            _ => 0,
        };

        Ok(ScanPage {
            cursor,
            keys: matching,
        })
    }

    async fn ping(&self) -> CacheResult<String> {
        self.begin("PING")?;
        Ok("PONG".to_string())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Redis-style glob: `*`, `?` and backslash escapes
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_from(&pattern, &text)
}

fn glob_match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => (0..=text.len()).any(|skip| glob_match_from(&pattern[1..], &text[skip..])),
        Some('?') => !text.is_empty() && glob_match_from(&pattern[1..], &text[1..]),
        Some('\\') if pattern.len() > 1 => {
            text.first() == Some(&pattern[1]) && glob_match_from(&pattern[2..], &text[1..])
        }
        Some(c) => text.first() == Some(c) && glob_match_from(&pattern[1..], &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("eiu:student:*", "eiu:student:list:all"));
        assert!(!glob_match("eiu:student:*", "eiu:student2:list:all"));
        assert!(glob_match("a?c", "abc"));
        assert!(glob_match("a\\*c", "a*c"));
        assert!(!glob_match("a\\*c", "abc"));
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "\"v\"", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("\"v\""));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let backend = MemoryBackend::new();
        backend.set_ex("k", "1", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(backend.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(backend.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_pages_through_matches() {
        let backend = MemoryBackend::new();
        for i in 0..5 {
            backend.insert_raw(&format!("p:{}", i), "1", Duration::from_secs(60));
        }
        backend.insert_raw("q:0", "1", Duration::from_secs(60));

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let page = backend.scan(cursor, "p:*", 2).await.unwrap();
            seen.extend(page.keys);
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|k| k.starts_with("p:")));
    }

    #[tokio::test]
    async fn test_scan_survives_deletes_between_pages() {
        let backend = MemoryBackend::new();
        for i in 0..7 {
            backend.insert_raw(&format!("p:{}", i), "1", Duration::from_secs(60));
        }

        let mut cursor = 0;
        let mut deleted = 0;
        loop {
            let page = backend.scan(cursor, "p:*", 3).await.unwrap();
            deleted += backend.delete(&page.keys).await.unwrap();
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(deleted, 7);
        assert!(backend.keys().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_scans_are_capped() {
        let backend = MemoryBackend::new();
        for i in 0..3 {
            backend.insert_raw(&format!("p:{}", i), "1", Duration::from_secs(60));
        }

        for _ in 0..(MAX_OPEN_SCANS * 2) {
            let page = backend.scan(0, "p:*", 1).await.unwrap();
            assert_ne!(page.cursor, 0);
        }
        assert_eq!(backend.scan_cursors.lock().unwrap().len(), MAX_OPEN_SCANS);
    }

    #[tokio::test]
    async fn test_foreign_entry_is_rejected_by_get() {
        let backend = MemoryBackend::new();
        backend.insert_foreign("h", Duration::from_secs(60));

        assert!(matches!(
            backend.get("h").await,
            Err(CacheError::CorruptedEntry { .. })
        ));
        assert_eq!(backend.delete(&["h".to_string()]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_backend_fails() {
        let backend = MemoryBackend::new();
        backend.set_unavailable(true);
        assert!(matches!(
            backend.get("k").await,
            Err(CacheError::StoreUnavailable(_))
        ));
    }
}
