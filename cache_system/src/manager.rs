//! Cache manager implementation
//!
//! This module provides the CacheManager struct: get-or-populate on top of
//! the store, plus key removal that delegates straight to it.

use crate::errors::{CacheError, CacheResult};
use crate::keys::KeyBuilder;
use crate::params::CachePolicy;
use crate::store::{CacheStore, Lookup};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Cache-aside orchestrator
///
/// Concurrent misses on the same key are not coalesced: each call runs its
/// own factory and the last write wins.
#[derive(Clone)]
pub struct CacheManager {
    store: CacheStore,
    policy: Arc<CachePolicy>,
    keys: KeyBuilder,
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("backend", &self.store.backend().name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl CacheManager {
    /// Create a new cache manager
    pub fn new(store: CacheStore, policy: Arc<CachePolicy>) -> Self {
        let keys = KeyBuilder::new(policy.project_namespace.clone());
        Self {
            store,
            policy,
            keys,
        }
    }

    /// Get the decoded value at `key`, or run `factory` and store its result.
    ///
    /// An absent (`None`) result is returned but not stored.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        factory: F,
        ttl: Option<Duration>,
    ) -> CacheResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        self.try_get_or_set(key, move || async move { Ok::<_, CacheError>(factory().await) }, ttl)
            .await
    }

    /// `get_or_set` with a fallible factory; factory errors are returned as-is
    pub async fn try_get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        factory: F,
        ttl: Option<Duration>,
    ) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        match self.store.lookup::<T>(key).await? {
            Lookup::Hit(value) => {
                tracing::debug!(key, "[CACHE_HIT]");
                return Ok(Some(value));
            }
            Lookup::Miss | Lookup::Corrupted(_) => {
                tracing::debug!(key, "[CACHE_MISS]");
            }
        }

        let result = factory().await?;

        if let Some(value) = &result {
            let ttl = self.policy.effective_ttl(ttl);
            self.store.set(key, value, Some(ttl)).await?;
        }

        Ok(result)
    }

    /// Delete specific key from cache
    pub async fn remove(&self, key: &str) -> CacheResult<bool> {
        self.store.remove(key).await
    }

    /// Delete every key under `prefix`
    pub async fn remove_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        self.store.remove_by_prefix(prefix).await
    }

    /// Ping the backend to check connectivity
    pub async fn ping(&self) -> CacheResult<String> {
        self.store.backend().ping().await
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }
}
