//! Core CacheHaus functionality
//!
//! This module contains the CacheHaus struct, which owns the store handle for
//! the lifetime of the process and hands out the components built on it.

use std::sync::Arc;

use cache_system::{
    CacheBackend, CacheManager, CachePolicy, CacheStore, KeyBuilder, RedisBackend,
};
use config::{AppConfig, CacheConfig};
use interceptor::CacheInterceptor;
use signal_system::SignalManager;

use crate::errors::CacheHausError;

/// Main CacheHaus coordinator
///
/// Connect once at startup, share by reference, call `shutdown` on exit.
pub struct CacheHaus {
    config: CacheConfig,
    keys: KeyBuilder,
    manager: Option<CacheManager>,
    interceptor: CacheInterceptor,
    signals: Arc<SignalManager>,
    redis: Option<Arc<RedisBackend>>,
}

impl std::fmt::Debug for CacheHaus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHaus")
            .field("enabled", &self.is_enabled())
            .field("namespace", &self.keys.namespace())
            .field("manager", &self.manager)
            .finish()
    }
}

impl CacheHaus {
    /// Create from the application config, connecting to Redis when enabled
    pub async fn new(config: AppConfig) -> Result<Self, CacheHausError> {
        Self::from_cache_config(config.cache).await
    }

    pub async fn from_cache_config(config: CacheConfig) -> Result<Self, CacheHausError> {
        config.validate()?;

        if !config.enabled {
            tracing::info!("[CACHEHAUS] caching disabled, operations run uncached");
            return Ok(Self::disabled(config));
        }

        let backend = Arc::new(
            RedisBackend::connect(&config.connection_string, config.connection_timeout()).await?,
        );
        let mut haus = Self::with_backend(backend.clone(), config)?;
        haus.redis = Some(backend);
        Ok(haus)
    }

    /// Build on an already constructed backend, no connection step
    pub fn with_backend(
        backend: Arc<dyn CacheBackend>,
        config: CacheConfig,
    ) -> Result<Self, CacheHausError> {
        config.validate()?;

        let policy = Arc::new(CachePolicy::from_config(&config));
        let store = CacheStore::new(backend, policy.default_ttl);
        let manager = CacheManager::new(store, policy);
        let signals = Arc::new(SignalManager::new());
        let interceptor = CacheInterceptor::new(manager.clone(), signals.clone());

        crate::debug_log!(
            "[CACHEHAUS] namespace '{}' on {} backend",
            manager.key_builder().namespace(),
            manager.store().backend().name()
        );

        Ok(Self {
            keys: manager.key_builder().clone(),
            config,
            manager: Some(manager),
            interceptor,
            signals,
            redis: None,
        })
    }

    fn disabled(config: CacheConfig) -> Self {
        let policy = CachePolicy::from_config(&config);
        Self {
            keys: KeyBuilder::new(policy.project_namespace),
            config,
            manager: None,
            interceptor: CacheInterceptor::disabled(),
            signals: Arc::new(SignalManager::new()),
            redis: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.manager.is_some()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache manager; `None` when caching is disabled
    pub fn manager(&self) -> Option<&CacheManager> {
        self.manager.as_ref()
    }

    /// Cache manager, or `CacheHausError::Disabled`
    pub fn require_manager(&self) -> Result<&CacheManager, CacheHausError> {
        self.manager.as_ref().ok_or(CacheHausError::Disabled)
    }

    pub fn interceptor(&self) -> &CacheInterceptor {
        &self.interceptor
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    /// Check store connectivity; always healthy when disabled
    pub async fn health_check(&self) -> Result<(), CacheHausError> {
        if let Some(manager) = &self.manager {
            let reply = manager.ping().await?;
            crate::trace_log!("[CACHEHAUS] ping: {}", reply);
        }
        Ok(())
    }

    /// Wait for detached populates, then close the connection.
    /// Returns the number of populates awaited.
    pub async fn shutdown(&self) -> usize {
        let drained = self.interceptor.drain_populates().await;
        let lost = self.signals.snapshot().lost_populates();
        if lost > 0 {
            tracing::warn!(lost, "[CACHEHAUS] detached populates did not finish");
        }

        if let Some(redis) = &self.redis {
            redis.close().await;
        }
        tracing::info!(drained, "[CACHEHAUS] shut down");
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_system::MemoryBackend;

    #[tokio::test]
    async fn test_disabled_config_skips_connection() {
        let haus = CacheHaus::from_cache_config(CacheConfig::disabled().with_project_alias("EIU"))
            .await
            .unwrap();

        assert!(!haus.is_enabled());
        assert!(haus.manager().is_none());
        assert!(matches!(haus.require_manager(), Err(CacheHausError::Disabled)));
        assert_eq!(haus.key_builder().namespace(), "eiu");
        haus.health_check().await.unwrap();
        assert_eq!(haus.shutdown().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = CacheHaus::from_cache_config(CacheConfig::new(String::new())).await;
        assert!(matches!(result, Err(CacheHausError::Config(_))));
    }

    #[tokio::test]
    async fn test_health_check_reports_store_fault() {
        let backend = Arc::new(MemoryBackend::new());
        let haus = CacheHaus::with_backend(
            backend.clone(),
            CacheConfig::new("memory://".to_string()).with_project_alias("eiu"),
        )
        .unwrap();

        haus.health_check().await.unwrap();
        backend.set_unavailable(true);
        assert!(matches!(
            haus.health_check().await,
            Err(CacheHausError::Cache(cache_system::CacheError::StoreUnavailable(_)))
        ));
    }

    #[test]
    fn test_with_backend_validates_config() {
        let backend = Arc::new(MemoryBackend::new());
        let result = CacheHaus::with_backend(
            backend.clone(),
            CacheConfig::new("memory://".to_string()).with_default_duration(0),
        );
        assert!(matches!(result, Err(CacheHausError::Config(_))));
        assert_eq!(backend.calls(), 0);
    }
}
