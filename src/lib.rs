//! # CacheHaus
//!
//! A cache-aside layer over Redis: deterministic namespaced keys, key suffixes
//! derived from operation arguments, and read/invalidate policies applied
//! around application operations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cachehaus::prelude::*;
//!
//! struct StudentController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::new("redis://127.0.0.1:6379".to_string())
//!         .with_project_alias("eiu");
//!     let haus = CacheHaus::from_cache_config(config).await?;
//!
//!     let list_students = with_cache(
//!         haus.interceptor(),
//!         OperationId::of::<StudentController>("list"),
//!         ReadPolicy::new().with_duration_seconds(120),
//!         |_: ()| async { Ok::<_, anyhow::Error>(vec!["An".to_string(), "Binh".to_string()]) },
//!     );
//!
//!     // First call computes and stores "eiu:student:list:all", the second is a hit
//!     let students = list_students.call(()).await?;
//!     let again = list_students.call(()).await?;
//!     assert_eq!(students, again);
//!
//!     haus.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::CacheHaus;
pub use errors::CacheHausError;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, StoreFaultMode};

// Re-export member crates
pub use cache_system;
pub use interceptor;
pub use signal_system;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
