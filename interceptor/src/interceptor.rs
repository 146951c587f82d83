//! Cache interceptor
//!
//! Wraps operation calls with a read policy (serve from cache, compute and
//! store on a miss) or an invalidate policy (run, then drop the entity's
//! cached results). Cache trouble never changes what a successful operation
//! returns, except for store faults under `StoreFaultMode::Propagate`.
//!
//! Store writes and invalidations run on their own task: dropping the
//! caller's future does not abort a write that has already started.

use crate::context::InvocationContext;
use crate::policy::{InvalidatePolicy, PopulateMode, ReadPolicy};
use cache_system::{
    CacheError, CacheManager, CacheResult, CacheStore, Lookup, ParameterKeyDeriver, StoreFaultMode,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use signal_system::{CacheEvent, EventType, SignalManager};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;

/// Read-path result that keeps a hit as the stored JSON text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPayload<T> {
    Hit(String),
    Computed(T),
}

impl<T: Serialize> CachedPayload<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CachedPayload::Hit(_))
    }

    /// JSON body for the caller: the stored payload on a hit
    pub fn into_json(self) -> serde_json::Result<String> {
        match self {
            CachedPayload::Hit(payload) => Ok(payload),
            CachedPayload::Computed(value) => serde_json::to_string(&value),
        }
    }
}

/// Key and labels of one intercepted call
struct Call<'a> {
    manager: &'a CacheManager,
    key: String,
    entity: &'a str,
    operation: &'a str,
}

impl Call<'_> {
    fn event(&self, event_type: EventType) -> CacheEvent {
        CacheEvent::new(event_type, &self.key)
            .with_entity(self.entity)
            .with_operation(self.operation)
    }
}

/// Applies cache policies around operation calls
#[derive(Clone)]
pub struct CacheInterceptor {
    manager: Option<CacheManager>,
    signals: Arc<SignalManager>,
    deriver: ParameterKeyDeriver,
    detached: Arc<Mutex<JoinSet<()>>>,
}

impl std::fmt::Debug for CacheInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInterceptor")
            .field("enabled", &self.is_enabled())
            .field("manager", &self.manager)
            .finish()
    }
}

impl CacheInterceptor {
    pub fn new(manager: CacheManager, signals: Arc<SignalManager>) -> Self {
        Self {
            manager: Some(manager),
            signals,
            deriver: ParameterKeyDeriver::new(),
            detached: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Interceptor with no store behind it; every call passes straight through
    pub fn disabled() -> Self {
        Self {
            manager: None,
            signals: Arc::new(SignalManager::new()),
            deriver: ParameterKeyDeriver::new(),
            detached: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.active().is_some()
    }

    pub fn manager(&self) -> Option<&CacheManager> {
        self.manager.as_ref()
    }

    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    fn active(&self) -> Option<&CacheManager> {
        self.manager.as_ref().filter(|m| m.policy().enabled)
    }

    /// Key a read-policy call would use; `None` when caching is off
    pub fn cache_key(
        &self,
        policy: &ReadPolicy,
        ctx: &InvocationContext,
    ) -> CacheResult<Option<String>> {
        let Some(manager) = self.active() else {
            return Ok(None);
        };
        let suffix = self.deriver.derive(&ctx.arguments, manager.policy())?;
        Ok(Some(manager.key_builder().build_with_suffix(
            policy.entity(ctx),
            &ctx.operation_name,
            &suffix,
        )))
    }

    /// Resolve the call's key. A derivation failure is reported and the call
    /// then runs uncached, so it cannot share a key with an unrelated call.
    fn begin<'a>(&'a self, policy: &'a ReadPolicy, ctx: &'a InvocationContext) -> Option<Call<'a>> {
        let entity = policy.entity(ctx);
        let operation = ctx.operation_name.as_str();

        match self.cache_key(policy, ctx) {
            Ok(key) => Some(Call {
                manager: self.active()?,
                key: key?,
                entity,
                operation,
            }),
            Err(e) => {
                tracing::warn!(entity, operation, error = %e, "[CACHE_KEY] running uncached");
                self.signals.emit(
                    CacheEvent::new(EventType::DerivationFailed, "")
                        .with_entity(entity)
                        .with_operation(operation)
                        .with_detail(e.to_string()),
                );
                None
            }
        }
    }

    /// Read path returning a decoded value
    pub async fn cached<T, E, F, Fut>(
        &self,
        policy: &ReadPolicy,
        ctx: &InvocationContext,
        operation: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(call) = self.begin(policy, ctx) else {
            return operation().await;
        };

        match call.manager.store().lookup::<T>(&call.key).await {
            Ok(Lookup::Hit(value)) => {
                tracing::debug!(key = %call.key, "[CACHE_HIT]");
                self.signals.emit(call.event(EventType::Hit));
                return Ok(value);
            }
            Ok(Lookup::Miss) => self.record_miss(&call),
            Ok(Lookup::Corrupted(e)) => {
                self.signals
                    .emit(call.event(EventType::CorruptedEntry).with_detail(e.to_string()));
                self.record_miss(&call);
            }
            Err(e) => {
                self.store_fault(&call, e)?;
                return operation().await;
            }
        }

        let value = operation().await?;
        self.populate(&call, policy, &value).await?;
        Ok(value)
    }

    /// Read path that hands back a hit as the stored payload, undecoded
    pub async fn cached_raw<T, E, F, Fut>(
        &self,
        policy: &ReadPolicy,
        ctx: &InvocationContext,
        operation: F,
    ) -> Result<CachedPayload<T>, E>
    where
        T: Serialize,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(call) = self.begin(policy, ctx) else {
            return operation().await.map(CachedPayload::Computed);
        };

        match call.manager.store().lookup_raw(&call.key).await {
            Ok(Lookup::Hit(payload)) => {
                tracing::debug!(key = %call.key, "[CACHE_HIT]");
                self.signals.emit(call.event(EventType::Hit));
                return Ok(CachedPayload::Hit(payload));
            }
            Ok(Lookup::Miss) => self.record_miss(&call),
            Ok(Lookup::Corrupted(e)) => {
                self.signals
                    .emit(call.event(EventType::CorruptedEntry).with_detail(e.to_string()));
                self.record_miss(&call);
            }
            Err(e) => {
                self.store_fault(&call, e)?;
                return operation().await.map(CachedPayload::Computed);
            }
        }

        let value = operation().await?;
        self.populate(&call, policy, &value).await?;
        Ok(CachedPayload::Computed(value))
    }

    /// Write path: run `operation`, and after it succeeds drop every cached
    /// result of the entity. The operation's result is returned unchanged.
    pub async fn invalidating<T, E, F, Fut>(
        &self,
        policy: &InvalidatePolicy,
        ctx: &InvocationContext,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = operation().await;
        if result.is_ok() {
            self.invalidate_entity(policy.entity(ctx)).await;
        }
        result
    }

    /// Remove all keys under the entity prefix. Failures are logged and
    /// signalled, never returned. `None` when nothing was removed because
    /// caching is off or the removal failed.
    pub async fn invalidate_entity(&self, entity: &str) -> Option<u64> {
        let manager = self.active()?;
        let prefix = manager.key_builder().entity_prefix(entity);

        let store = manager.store().clone();
        let task_prefix = prefix.clone();
        let outcome = tokio::spawn(async move { store.remove_by_prefix(&task_prefix).await })
            .await
            .unwrap_or_else(|e| Err(CacheError::General(format!("invalidation task failed: {}", e))));

        match outcome {
            Ok(removed) => {
                tracing::debug!(prefix = %prefix, removed, "[CACHE_INVALIDATE]");
                self.signals.emit(
                    CacheEvent::new(EventType::Invalidated, &prefix)
                        .with_entity(entity)
                        .with_detail(format!("removed {}", removed)),
                );
                Some(removed)
            }
            Err(source) => {
                let error = CacheError::InvalidationFailure {
                    prefix: prefix.clone(),
                    source: Box::new(source),
                };
                tracing::error!(prefix = %prefix, error = %error, "[CACHE_INVALIDATE] stale entries may remain");
                self.signals.emit(
                    CacheEvent::new(EventType::InvalidationFailed, &prefix)
                        .with_entity(entity)
                        .with_detail(error.to_string()),
                );
                None
            }
        }
    }

    /// Wait for every detached populate started so far; returns how many
    /// were awaited
    pub async fn drain_populates(&self) -> usize {
        let mut pending = {
            let mut set = self.detached.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *set)
        };

        let mut drained = 0;
        while let Some(result) = pending.join_next().await {
            drained += 1;
            if let Err(e) = result {
                tracing::warn!(error = %e, "[CACHE_DETACHED] populate task aborted");
            }
        }
        drained
    }

    fn record_miss(&self, call: &Call<'_>) {
        tracing::debug!(key = %call.key, "[CACHE_MISS]");
        self.signals.emit(call.event(EventType::Miss));
    }

    /// Decide what a failed store read means for the call. `Ok` means run
    /// the operation uncached.
    fn store_fault(&self, call: &Call<'_>, error: CacheError) -> CacheResult<()> {
        match call.manager.policy().store_fault_mode {
            StoreFaultMode::Propagate => Err(error),
            StoreFaultMode::Bypass => {
                tracing::warn!(key = %call.key, error = %error, "[CACHE_BYPASS]");
                self.signals
                    .emit(call.event(EventType::Bypassed).with_detail(error.to_string()));
                Ok(())
            }
        }
    }

    /// Store a computed value. Null results are not stored. Only a store
    /// fault under `Propagate` is returned; every other failure is reported
    /// and the caller keeps its value.
    async fn populate<T: Serialize>(
        &self,
        call: &Call<'_>,
        policy: &ReadPolicy,
        value: &T,
    ) -> CacheResult<()> {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %call.key, error = %e, "[CACHE_SET] result not serializable");
                self.signals
                    .emit(call.event(EventType::PopulateFailed).with_detail(e.to_string()));
                return Ok(());
            }
        };
        if payload == "null" {
            tracing::trace!(key = %call.key, "[CACHE_SET] null result not stored");
            return Ok(());
        }

        let ttl = call.manager.policy().effective_ttl(policy.ttl);
        let store = call.manager.store().clone();

        match policy.populate {
            PopulateMode::Await => {
                let key = call.key.clone();
                let outcome =
                    tokio::spawn(async move { store.set_raw(&key, &payload, Some(ttl)).await })
                        .await
                        .unwrap_or_else(|e| {
                            Err(CacheError::General(format!("populate task failed: {}", e)))
                        });

                match outcome {
                    Ok(()) => {
                        self.signals.emit(call.event(EventType::Populated));
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!(key = %call.key, error = %e, "[CACHE_SET] populate failed");
                        self.signals
                            .emit(call.event(EventType::PopulateFailed).with_detail(e.to_string()));
                        match call.manager.policy().store_fault_mode {
                            StoreFaultMode::Propagate if e.is_unavailable() => Err(e),
                            _ => Ok(()),
                        }
                    }
                }
            }
            PopulateMode::Detached => {
                self.spawn_detached(call, store, payload, ttl);
                Ok(())
            }
        }
    }

    fn spawn_detached(&self, call: &Call<'_>, store: CacheStore, payload: String, ttl: Duration) {
        let signals = self.signals.clone();
        let template = call.event(EventType::DetachedStarted);
        signals.emit(template.clone());

        let task = async move {
            let outcome = store.set_raw(&template.key, &payload, Some(ttl)).await;
            let follow_up = |event_type: EventType| CacheEvent {
                event_type,
                timestamp: chrono::Utc::now(),
                ..template.clone()
            };

            match outcome {
                Ok(()) => {
                    signals.emit(follow_up(EventType::Populated));
                    signals.emit(follow_up(EventType::DetachedCompleted));
                }
                Err(e) => {
                    tracing::warn!(key = %template.key, error = %e, "[CACHE_DETACHED] populate failed");
                    signals.emit(follow_up(EventType::PopulateFailed).with_detail(e.to_string()));
                    signals.emit(follow_up(EventType::DetachedFailed).with_detail(e.to_string()));
                }
            }
        };

        let mut set = self.detached.lock().unwrap_or_else(PoisonError::into_inner);
        while set.try_join_next().is_some() {}
        set.spawn(task);
    }
}
