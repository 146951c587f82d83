//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::backend::{CacheBackend, RedisBackend};
pub use crate::errors::{CacheError, CacheResult};
pub use crate::fingerprint::ParameterKeyDeriver;
pub use crate::keys::KeyBuilder;
pub use crate::manager::CacheManager;
pub use crate::memory::MemoryBackend;
pub use crate::params::CachePolicy;
pub use crate::store::CacheStore;

// Re-export centralized config
pub use config::{CacheConfig, StoreFaultMode};

// Common external dependencies
pub use async_trait::async_trait;
pub use redis;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;
