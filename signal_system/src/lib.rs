//! Signal system for cache event handling
//!
//! This crate provides event delivery and counters for the decisions the
//! cache layer makes: hits, misses, populates and invalidations.

pub mod event;
pub mod manager;
pub mod prelude;
pub mod stats;
pub mod types;

pub use event::{CacheEvent, EventType};
pub use manager::SignalManager;
pub use stats::{SignalStats, StatsSnapshot};
pub use types::{CallbackId, EventCallback};
