//! Type definitions for signal system

use crate::event::CacheEvent;

/// Event callback type
pub type EventCallback = Box<dyn Fn(&CacheEvent) + Send + Sync>;

/// Handle returned by `SignalManager::add_callback`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);
