//! Convenience re-exports for common signal-system usage

// Core signal system components
pub use crate::event::{CacheEvent, EventType};
pub use crate::manager::SignalManager;
pub use crate::stats::{SignalStats, StatsSnapshot};
pub use crate::types::{CallbackId, EventCallback};
