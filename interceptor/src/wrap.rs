//! Operation wrappers
//!
//! `with_cache` and `with_invalidate` bind a handler to a policy once, so
//! call sites only pass arguments.

use crate::context::OperationId;
use crate::interceptor::{CacheInterceptor, CachedPayload};
use crate::policy::{InvalidatePolicy, ReadPolicy};
use cache_system::CacheError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use type_mapping::ToArguments;

/// Handler wrapped with a read policy
#[derive(Debug, Clone)]
pub struct CachedOperation<F> {
    interceptor: CacheInterceptor,
    id: OperationId,
    policy: ReadPolicy,
    handler: F,
}

impl<F> CachedOperation<F> {
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub fn policy(&self) -> &ReadPolicy {
        &self.policy
    }

    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        A: ToArguments,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
    {
        let ctx = self.id.context(&args);
        self.interceptor
            .cached(&self.policy, &ctx, || (self.handler)(args))
            .await
    }

    /// Like `call`, with a hit returned as the stored payload
    pub async fn call_raw<A, T, E, Fut>(&self, args: A) -> Result<CachedPayload<T>, E>
    where
        A: ToArguments,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: From<CacheError>,
    {
        let ctx = self.id.context(&args);
        self.interceptor
            .cached_raw(&self.policy, &ctx, || (self.handler)(args))
            .await
    }
}

/// Handler wrapped with an invalidate policy
#[derive(Debug, Clone)]
pub struct InvalidatingOperation<F> {
    interceptor: CacheInterceptor,
    id: OperationId,
    policy: InvalidatePolicy,
    handler: F,
}

impl<F> InvalidatingOperation<F> {
    pub fn id(&self) -> &OperationId {
        &self.id
    }

    pub async fn call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        A: ToArguments,
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ctx = self.id.context(&args);
        self.interceptor
            .invalidating(&self.policy, &ctx, || (self.handler)(args))
            .await
    }
}

pub fn with_cache<F>(
    interceptor: &CacheInterceptor,
    id: OperationId,
    policy: ReadPolicy,
    handler: F,
) -> CachedOperation<F> {
    CachedOperation {
        interceptor: interceptor.clone(),
        id,
        policy,
        handler,
    }
}

pub fn with_invalidate<F>(
    interceptor: &CacheInterceptor,
    id: OperationId,
    policy: InvalidatePolicy,
    handler: F,
) -> InvalidatingOperation<F> {
    InvalidatingOperation {
        interceptor: interceptor.clone(),
        id,
        policy,
        handler,
    }
}
