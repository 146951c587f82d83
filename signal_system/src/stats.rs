//! Cache event counters

use crate::event::EventType;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals per event type
#[derive(Debug, Default)]
pub struct SignalStats {
    hits: AtomicU64,
    misses: AtomicU64,
    populated: AtomicU64,
    populate_failures: AtomicU64,
    invalidations: AtomicU64,
    invalidation_failures: AtomicU64,
    derivation_failures: AtomicU64,
    corrupted_entries: AtomicU64,
    bypassed: AtomicU64,
    detached_started: AtomicU64,
    detached_completed: AtomicU64,
    detached_failed: AtomicU64,
}

/// Point-in-time copy of `SignalStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub populated: u64,
    pub populate_failures: u64,
    pub invalidations: u64,
    pub invalidation_failures: u64,
    pub derivation_failures: u64,
    pub corrupted_entries: u64,
    pub bypassed: u64,
    pub detached_started: u64,
    pub detached_completed: u64,
    pub detached_failed: u64,
}

impl StatsSnapshot {
    /// Detached populates that were started but never finished
    pub fn lost_populates(&self) -> u64 {
        self.detached_started
            .saturating_sub(self.detached_completed)
            .saturating_sub(self.detached_failed)
    }

    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl SignalStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event_type: EventType) {
        self.counter(event_type).fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self, event_type: EventType) -> u64 {
        self.counter(event_type).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.count(EventType::Hit),
            misses: self.count(EventType::Miss),
            populated: self.count(EventType::Populated),
            populate_failures: self.count(EventType::PopulateFailed),
            invalidations: self.count(EventType::Invalidated),
            invalidation_failures: self.count(EventType::InvalidationFailed),
            derivation_failures: self.count(EventType::DerivationFailed),
            corrupted_entries: self.count(EventType::CorruptedEntry),
            bypassed: self.count(EventType::Bypassed),
            detached_started: self.count(EventType::DetachedStarted),
            detached_completed: self.count(EventType::DetachedCompleted),
            detached_failed: self.count(EventType::DetachedFailed),
        }
    }

    fn counter(&self, event_type: EventType) -> &AtomicU64 {
        match event_type {
            EventType::Hit => &self.hits,
            EventType::Miss => &self.misses,
            EventType::Populated => &self.populated,
            EventType::PopulateFailed => &self.populate_failures,
            EventType::Invalidated => &self.invalidations,
            EventType::InvalidationFailed => &self.invalidation_failures,
            EventType::DerivationFailed => &self.derivation_failures,
            EventType::CorruptedEntry => &self.corrupted_entries,
            EventType::Bypassed => &self.bypassed,
            EventType::DetachedStarted => &self.detached_started,
            EventType::DetachedCompleted => &self.detached_completed,
            EventType::DetachedFailed => &self.detached_failed,
        }
    }
}
