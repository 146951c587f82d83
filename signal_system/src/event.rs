//! Cache event types and definitions
//!
//! This module defines the structure of cache events
//! that flow through the signal system.

use serde::{Deserialize, Serialize};

/// Cache event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Hit,
    Miss,
    Populated,
    PopulateFailed,
    Invalidated,
    InvalidationFailed,
    DerivationFailed,
    CorruptedEntry,
    /// Store fault tolerated; the operation ran uncached
    Bypassed,
    DetachedStarted,
    DetachedCompleted,
    DetachedFailed,
}

/// Cache event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEvent {
    /// Event type
    pub event_type: EventType,
    /// Cache key, or prefix for invalidation events
    pub key: String,
    /// Entity the operation belongs to
    pub entity: Option<String>,
    /// Operation name
    pub operation: Option<String>,
    /// Error text or other detail
    pub detail: Option<String>,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl CacheEvent {
    pub fn new(event_type: EventType, key: impl Into<String>) -> Self {
        Self {
            event_type,
            key: key.into(),
            entity: None,
            operation: None,
            detail: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.event_type,
            EventType::PopulateFailed
                | EventType::InvalidationFailed
                | EventType::DerivationFailed
                | EventType::CorruptedEntry
                | EventType::Bypassed
                | EventType::DetachedFailed
        )
    }

    /// Compact JSON form for log shipping
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
