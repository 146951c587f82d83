//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! during cache operations and Redis interactions.

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Argument list could not be turned into a key suffix
    #[error("Key derivation failed for argument '{argument}': {reason}")]
    DerivationFailure { argument: String, reason: String },

    /// Stored payload does not decode into the expected type
    #[error("Corrupted cache entry at '{key}': {reason}")]
    CorruptedEntry { key: String, reason: String },

    /// Prefix removal did not complete
    #[error("Invalidation of prefix '{prefix}' failed: {source}")]
    InvalidationFailure {
        prefix: String,
        #[source]
        source: Box<CacheError>,
    },

    /// The store answered, but refused the command or replied with an
    /// unexpected shape
    #[error("Cache store rejected the command: {0}")]
    Rejected(String),

    #[error("Invalid TTL value: {0}")]
    InvalidTtl(u64),

    #[error("Cache is disabled")]
    Disabled,

    #[error("General cache error: {0}")]
    General(String),
}

impl CacheError {
    pub fn is_unavailable(&self) -> bool {
        match self {
            CacheError::StoreUnavailable(_) => true,
            CacheError::InvalidationFailure { source, .. } => source.is_unavailable(),
            _ => false,
        }
    }
}

/// Connection-level failures are outages; anything the server answered is a
/// rejection of that one command
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        use redis::ErrorKind;

        let unreachable = err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
            || matches!(
                err.kind(),
                ErrorKind::BusyLoadingError
                    | ErrorKind::TryAgain
                    | ErrorKind::ClusterDown
                    | ErrorKind::MasterDown
            );

        if unreachable {
            CacheError::StoreUnavailable(err.to_string())
        } else {
            CacheError::Rejected(err.to_string())
        }
    }
}

/// Convenience Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;
    use redis::{ErrorKind, RedisError};

    #[test]
    fn test_connection_failures_are_unavailable() {
        let refused = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(CacheError::from(refused).is_unavailable());

        let loading = RedisError::from((ErrorKind::BusyLoadingError, "loading"));
        assert!(CacheError::from(loading).is_unavailable());
    }

    #[test]
    fn test_server_replies_are_rejections() {
        let wrong_type = RedisError::from((
            ErrorKind::ExtensionError,
            "WRONGTYPE",
            "Operation against a key holding the wrong kind of value".to_string(),
        ));
        assert!(matches!(CacheError::from(wrong_type), CacheError::Rejected(_)));

        let bad_reply = RedisError::from((ErrorKind::TypeError, "unexpected reply"));
        assert!(matches!(CacheError::from(bad_reply), CacheError::Rejected(_)));
    }
}
