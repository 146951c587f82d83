//! Convenience re-exports for common CacheHaus usage
//!
//! ```rust
//! use cachehaus::prelude::*;
//! ```

// Core CacheHaus components
pub use crate::core::CacheHaus;
pub use crate::errors::CacheHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, ConfigError, StoreFaultMode};

// Re-export signal system for event handling
pub use signal_system::prelude::*;

// Re-export cache system
pub use cache_system::prelude::*;

// Interception layer
pub use interceptor::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use tokio;
