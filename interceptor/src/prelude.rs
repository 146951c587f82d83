//! Common imports for intercepted services

pub use crate::context::{target_identity_of, InvocationContext, OperationId};
pub use crate::interceptor::{CacheInterceptor, CachedPayload};
pub use crate::policy::{InvalidatePolicy, PopulateMode, ReadPolicy};
pub use crate::wrap::{with_cache, with_invalidate, CachedOperation, InvalidatingOperation};

pub use type_mapping::{Arguments, QueryFilter, ToArguments};
