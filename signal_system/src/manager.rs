use crate::event::CacheEvent;
use crate::stats::{SignalStats, StatsSnapshot};
use crate::types::{CallbackId, EventCallback};
use std::sync::atomic::{AtomicU64, Ordering};

/// Signal manager for cache event notifications
pub struct SignalManager {
    callbacks: std::sync::RwLock<Vec<(CallbackId, EventCallback)>>,
    next_id: AtomicU64,
    stats: SignalStats,
}

impl std::fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("callback_count", &self.callback_count())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl SignalManager {
    pub fn new() -> Self {
        Self {
            callbacks: std::sync::RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            stats: SignalStats::new(),
        }
    }

    /// Add event callback
    pub fn add_callback<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.push((id, Box::new(callback)));
        }
        id
    }

    /// Remove a callback, returns whether it was registered
    pub fn remove_callback(&self, id: CallbackId) -> bool {
        match self.callbacks.write() {
            Ok(mut callbacks) => {
                let before = callbacks.len();
                callbacks.retain(|(existing, _)| *existing != id);
                callbacks.len() != before
            }
            Err(_) => false,
        }
    }

    /// Count the event and deliver it to all subscribers
    pub fn emit(&self, event: CacheEvent) {
        self.stats.record(event.event_type);

        if event.is_failure() {
            tracing::debug!(
                event_type = ?event.event_type,
                key = %event.key,
                detail = event.detail.as_deref().unwrap_or(""),
                "[CACHE_SIGNAL]"
            );
        }

        if let Ok(callbacks) = self.callbacks.read() {
            for (_, callback) in callbacks.iter() {
                callback(&event);
            }
        }
    }

    /// Clear all callbacks
    pub fn clear_callbacks(&self) {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.clear();
        }
    }

    /// Get number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> &SignalStats {
        &self.stats
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_reaches_callbacks_and_counts() {
        let manager = SignalManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        manager.add_callback(move |event| {
            sink.lock().unwrap().push(event.event_type);
        });

        manager.emit(CacheEvent::new(EventType::Miss, "eiu:student:list:all"));
        manager.emit(CacheEvent::new(EventType::Hit, "eiu:student:list:all"));

        assert_eq!(*seen.lock().unwrap(), vec![EventType::Miss, EventType::Hit]);
        assert_eq!(manager.snapshot().hits, 1);
        assert_eq!(manager.snapshot().misses, 1);
    }

    #[test]
    fn test_remove_callback() {
        let manager = SignalManager::new();
        let id = manager.add_callback(|_| {});
        assert_eq!(manager.callback_count(), 1);
        assert!(manager.remove_callback(id));
        assert!(!manager.remove_callback(id));
        assert_eq!(manager.callback_count(), 0);
    }

    #[test]
    fn test_event_json() {
        let event = CacheEvent::new(EventType::InvalidationFailed, "eiu:student")
            .with_entity("student")
            .with_detail("connection refused");
        let json = event.to_json().unwrap();
        assert!(json.contains("\"event_type\":\"invalidation_failed\""));
        assert!(event.is_failure());
    }
}
