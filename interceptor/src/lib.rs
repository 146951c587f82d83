//! Cache interception layer
//!
//! Applies read and invalidate policies around application operations on top
//! of the cache-system crate.

pub mod context;
pub mod interceptor;
pub mod policy;
pub mod prelude;
pub mod wrap;

pub use context::{target_identity_of, InvocationContext, OperationId};
pub use interceptor::{CacheInterceptor, CachedPayload};
pub use policy::{InvalidatePolicy, PopulateMode, ReadPolicy};
pub use wrap::{with_cache, with_invalidate, CachedOperation, InvalidatingOperation};
