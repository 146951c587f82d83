//! Cache store
//!
//! Raw and typed access to the shared key-value backend. Values are written
//! as compact JSON text and parsed back on read.
//!
//! `remove_by_prefix` is not atomic: it walks the keyspace with `SCAN` and
//! deletes page by page, so a failure part way leaves some matching keys in
//! place. A concurrent `set` on a matching key during the walk may survive or
//! be deleted; either outcome is acceptable for best-effort invalidation.

use crate::backend::CacheBackend;
use crate::errors::{CacheError, CacheResult};
use crate::keys::prefix_pattern;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Keys requested per `SCAN` page
pub const SCAN_BATCH: usize = 500;

/// Outcome of a typed lookup
#[derive(Debug)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    /// The payload did not decode and the key has been deleted
    Corrupted(CacheError),
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Corrupted(_) => None,
        }
    }
}

/// Typed front of a `CacheBackend`
#[derive(Debug, Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Raw payload stored at `key`; a corrupted entry reads as absent
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.lookup_raw(key).await?.into_option())
    }

    /// Raw payload, reporting entries the backend could not read. Those are
    /// deleted before returning.
    pub async fn lookup_raw(&self, key: &str) -> CacheResult<Lookup<String>> {
        match self.backend.get(key).await {
            Ok(payload) => {
                tracing::trace!(key, hit = payload.is_some(), "[CACHE_GET]");
                Ok(match payload.filter(|p| !p.is_empty()) {
                    Some(payload) => Lookup::Hit(payload),
                    None => Lookup::Miss,
                })
            }
            Err(e @ CacheError::CorruptedEntry { .. }) => {
                self.discard(key, &e).await;
                Ok(Lookup::Corrupted(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Decoded value stored at `key`; undecodable payloads read as absent
    pub async fn get_typed<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self.lookup(key).await?.into_option())
    }

    /// Like `get_typed`, but reports corruption to the caller
    pub async fn lookup<T>(&self, key: &str) -> CacheResult<Lookup<T>>
    where
        T: DeserializeOwned,
    {
        let payload = match self.lookup_raw(key).await? {
            Lookup::Hit(payload) => payload,
            Lookup::Miss => return Ok(Lookup::Miss),
            Lookup::Corrupted(e) => return Ok(Lookup::Corrupted(e)),
        };

        match serde_json::from_str::<T>(&payload) {
            Ok(value) => Ok(Lookup::Hit(value)),
            Err(e) => {
                let error = CacheError::CorruptedEntry {
                    key: key.to_string(),
                    reason: e.to_string(),
                };
                self.discard(key, &error).await;
                Ok(Lookup::Corrupted(error))
            }
        }
    }

    async fn discard(&self, key: &str, error: &CacheError) {
        tracing::warn!(key, error = %error, "[CACHE_CORRUPTED] dropping unreadable entry");
        if let Err(delete_err) = self.remove(key).await {
            tracing::warn!(key, error = %delete_err, "[CACHE_CORRUPTED] delete failed");
        }
    }

    /// Serialize `value` and store it; `ttl` falls back to the default
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(value)?;
        self.set_raw(key, &payload, ttl).await
    }

    /// Store an already serialized payload
    pub async fn set_raw(&self, key: &str, payload: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.backend.set_ex(key, payload, ttl).await?;
        tracing::trace!(key, ttl_secs = ttl.as_secs(), "[CACHE_SET]");
        Ok(())
    }

    /// Delete one key, returns whether it existed
    pub async fn remove(&self, key: &str) -> CacheResult<bool> {
        let deleted = self.backend.delete(&[key.to_string()]).await?;
        Ok(deleted > 0)
    }

    /// Delete every key under `prefix`, returns the number removed
    pub async fn remove_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let pattern = prefix_pattern(prefix);
        let mut cursor = 0;
        let mut removed = 0;

        loop {
            let page = match self.backend.scan(cursor, &pattern, SCAN_BATCH).await {
                Ok(page) => page,
                Err(e) => return Err(partial_removal(prefix, removed, e)),
            };

            if !page.keys.is_empty() {
                match self.backend.delete(&page.keys).await {
                    Ok(count) => removed += count,
                    Err(e) => return Err(partial_removal(prefix, removed, e)),
                }
            }

            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(prefix, removed, "[CACHE_REMOVE_PREFIX]");
        Ok(removed)
    }
}

fn partial_removal(prefix: &str, removed: u64, error: CacheError) -> CacheError {
    if removed > 0 {
        tracing::warn!(prefix, removed, error = %error, "[CACHE_REMOVE_PREFIX] stopped part way");
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Student {
        student_id: i32,
        full_name: String,
    }

    fn store() -> (Arc<MemoryBackend>, CacheStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::new(backend.clone(), Duration::from_secs(60));
        (backend, store)
    }

    #[tokio::test]
    async fn test_set_writes_compact_json() {
        let (_, store) = store();
        let student = Student {
            student_id: 1,
            full_name: "An Nguyen".into(),
        };
        store.set("eiu:student:get:1", &student, None).await.unwrap();

        assert_eq!(
            store.get("eiu:student:get:1").await.unwrap().as_deref(),
            Some(r#"{"studentId":1,"fullName":"An Nguyen"}"#)
        );
        assert_eq!(
            store.get_typed::<Student>("eiu:student:get:1").await.unwrap(),
            Some(student)
        );
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_absent_and_deleted() {
        let (backend, store) = store();
        backend.insert_raw("eiu:student:get:1", "{not json", Duration::from_secs(60));

        let value = store.get_typed::<Student>("eiu:student:get:1").await.unwrap();
        assert!(value.is_none());
        assert!(!backend.contains("eiu:student:get:1"));
    }

    #[tokio::test]
    async fn test_lookup_reports_corruption() {
        let (backend, store) = store();
        backend.insert_raw("k", "[1,2]", Duration::from_secs(60));

        let lookup = store.lookup::<Student>("k").await.unwrap();
        assert!(matches!(lookup, Lookup::Corrupted(CacheError::CorruptedEntry { .. })));
    }

    #[tokio::test]
    async fn test_wrong_type_entry_is_absent_and_deleted() {
        let (backend, store) = store();
        backend.insert_foreign("eiu:student:get:1", Duration::from_secs(60));

        let lookup = store.lookup::<Student>("eiu:student:get:1").await.unwrap();
        assert!(matches!(lookup, Lookup::Corrupted(CacheError::CorruptedEntry { .. })));
        assert!(!backend.contains("eiu:student:get:1"));

        backend.insert_foreign("eiu:student:list:all", Duration::from_secs(60));
        assert_eq!(store.get("eiu:student:list:all").await.unwrap(), None);
        assert!(!backend.contains("eiu:student:list:all"));
    }

    #[tokio::test]
    async fn test_remove_by_prefix_isolates_entities() {
        let (backend, store) = store();
        for i in 0..(SCAN_BATCH + 20) {
            store
                .set(&format!("eiu:student:get:{}", i), &i, None)
                .await
                .unwrap();
        }
        store.set("eiu:student2:list:all", &1, None).await.unwrap();
        store.set("eiu:course:list:all", &1, None).await.unwrap();

        let removed = store.remove_by_prefix("eiu:student").await.unwrap();

        assert_eq!(removed, (SCAN_BATCH + 20) as u64);
        assert!(backend.keys().iter().all(|k| !k.starts_with("eiu:student:")));
        assert!(backend.contains("eiu:student2:list:all"));
        assert!(backend.contains("eiu:course:list:all"));
    }

    #[tokio::test]
    async fn test_remove_by_prefix_propagates_store_failure() {
        let (backend, store) = store();
        store.set("eiu:student:list:all", &1, None).await.unwrap();
        backend.set_unavailable(true);

        let result = store.remove_by_prefix("eiu:student").await;
        assert!(matches!(result, Err(CacheError::StoreUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_enforced_by_backend() {
        let (_, store) = store();
        store
            .set("eiu:student:list:all", &vec![1, 2, 3], Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(store.get("eiu:student:list:all").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("eiu:student:list:all").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_single_key() {
        let (_, store) = store();
        store.set("k", "v", None).await.unwrap();
        assert!(store.remove("k").await.unwrap());
        assert!(!store.remove("k").await.unwrap());
    }
}
