//! Cache policy
//!
//! This module defines the CachePolicy struct, the process-wide and
//! read-only view of the cache configuration.

use config::{CacheConfig, StoreFaultMode};
use std::time::Duration;

/// Process-wide cache behaviour, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    /// TTL used when an operation gives no override
    pub default_ttl: Duration,
    pub auto_key_by_parameters: bool,
    /// First key segment
    pub project_namespace: String,
    pub store_fault_mode: StoreFaultMode,
}

impl CachePolicy {
    pub fn new(project_namespace: &str) -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(60),
            auto_key_by_parameters: true,
            project_namespace: project_namespace.to_lowercase(),
            store_fault_mode: StoreFaultMode::Propagate,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            default_ttl: config.ttl_duration(),
            auto_key_by_parameters: config.auto_key_by_parameters,
            project_namespace: config.namespace().to_lowercase(),
            store_fault_mode: config.store_fault_mode,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_auto_key_by_parameters(mut self, enabled: bool) -> Self {
        self.auto_key_by_parameters = enabled;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_store_fault_mode(mut self, mode: StoreFaultMode) -> Self {
        self.store_fault_mode = mode;
        self
    }

    /// Explicit override when given, else the default TTL
    pub fn effective_ttl(&self, ttl: Option<Duration>) -> Duration {
        ttl.filter(|t| !t.is_zero()).unwrap_or(self.default_ttl)
    }
}
