//! Cache system for Redis-based caching
//!
//! This crate provides the storage side of the cache layer: deterministic
//! key construction, parameter-derived key suffixes, typed store access and
//! the get-or-populate manager.

pub mod backend;
pub mod errors;
pub mod fingerprint;
pub mod keys;
pub mod manager;
pub mod memory;
pub mod params;
pub mod prelude;
pub mod store;

// Re-export centralized config
pub use config::{CacheConfig, StoreFaultMode};

pub use backend::{CacheBackend, RedisBackend, ScanPage};
pub use errors::{CacheError, CacheResult};
pub use fingerprint::{content_hash, ParameterKeyDeriver};
pub use keys::KeyBuilder;
pub use manager::CacheManager;
pub use memory::MemoryBackend;
pub use params::CachePolicy;
pub use store::{CacheStore, Lookup};
