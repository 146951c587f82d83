//! Per-operation cache policies

use std::time::Duration;

use crate::context::InvocationContext;

/// When the store write of a read-path miss completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PopulateMode {
    /// The call returns only after the value is in the store
    #[default]
    Await,
    /// The write runs on a background task; the call returns right away.
    /// Progress is visible through the detached populate counters.
    Detached,
}

/// Read policy: serve from cache, compute and store on a miss
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPolicy {
    /// TTL override; the process default applies when unset
    pub ttl: Option<Duration>,
    /// Entity override; the invocation's target identity applies when unset
    pub entity: Option<String>,
    pub populate: PopulateMode,
}

impl ReadPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_duration_seconds(self, seconds: u64) -> Self {
        self.with_ttl(Duration::from_secs(seconds))
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_populate(mut self, populate: PopulateMode) -> Self {
        self.populate = populate;
        self
    }

    pub fn entity<'a>(&'a self, ctx: &'a InvocationContext) -> &'a str {
        self.entity.as_deref().unwrap_or(&ctx.target_identity)
    }
}

/// Invalidate policy: after a successful call, drop every cached result of
/// the entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidatePolicy {
    /// Entity override; the invocation's target identity applies when unset
    pub entity: Option<String>,
}

impl InvalidatePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
        }
    }

    pub fn entity<'a>(&'a self, ctx: &'a InvocationContext) -> &'a str {
        self.entity.as_deref().unwrap_or(&ctx.target_identity)
    }
}
