//! Parameter key derivation
//!
//! Turns an operation's argument list into a stable key suffix. Strategies,
//! in priority order:
//!
//! 1. an argument tagged as a query filter is hashed: `:dxo:{hash}`
//! 2. a single structured argument is hashed: `:obj:{hash}`
//! 3. otherwise every argument is rendered in order: `:{name}-{value}`
//!
//! Names are escaped like key segments and additionally have `-` encoded, so
//! the first `-` always ends the name. A null value renders as `%00`, which no
//! escaped string can produce, so `None` and `""` never share a key.
//!
//! A value that cannot be serialized yields `CacheError::DerivationFailure`,
//! never an empty suffix, so distinct calls cannot collapse onto one key.

use crate::errors::{CacheError, CacheResult};
use crate::keys::escape_segment;
use crate::params::CachePolicy;
use sha2::{Digest, Sha256};
use type_mapping::{ArgValue, Argument, Arguments};

/// Hex characters kept from the SHA-256 digest (48 bits)
pub const DIGEST_HEX_LEN: usize = 12;

const FILTER_TAG: &str = "dxo";
const NULL_TOKEN: &str = "%00";
const OBJECT_TAG: &str = "obj";

/// Truncated, lower-case SHA-256 of `content`
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..DIGEST_HEX_LEN].to_string()
}

/// Derives key suffixes from argument lists
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterKeyDeriver;

impl ParameterKeyDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Suffix for `arguments`; empty when auto-keying is off or there are no arguments
    pub fn derive(&self, arguments: &Arguments, policy: &CachePolicy) -> CacheResult<String> {
        if !policy.auto_key_by_parameters || arguments.is_empty() {
            return Ok(String::new());
        }

        if let Some(filter) = arguments.iter().find(|arg| arg.value.is_filter()) {
            return Ok(format!(":{}:{}", FILTER_TAG, hash_argument(filter)?));
        }

        if arguments.len() == 1 {
            if let Some(single) = arguments.first().filter(|arg| arg.value.is_structured()) {
                return Ok(format!(":{}:{}", OBJECT_TAG, hash_argument(single)?));
            }
        }

        let mut suffix = String::new();
        for argument in arguments {
            suffix.push(':');
            suffix.push_str(&escape_name(&argument.name));
            suffix.push('-');
            suffix.push_str(&render_value(argument)?);
        }
        Ok(suffix)
    }
}

fn hash_argument(argument: &Argument) -> CacheResult<String> {
    let canonical = argument
        .value
        .canonical_json()
        .map_err(|e| derivation_failure(argument, e.to_string()))?;
    Ok(content_hash(&canonical))
}

fn escape_name(name: &str) -> String {
    escape_segment(name).replace('-', "%2d")
}

/// Key-ready rendering of one value
fn render_value(argument: &Argument) -> CacheResult<String> {
    match &argument.value {
        ArgValue::Invalid(reason) => Err(derivation_failure(argument, reason.clone())),
        ArgValue::Null => Ok(NULL_TOKEN.to_string()),
        // Structured values among several arguments are keyed by content
        value if value.is_structured() => Ok(format!("{}.{}", OBJECT_TAG, hash_argument(argument)?)),
        value => value
            .scalar_text()
            .map(|text| escape_segment(&text))
            .ok_or_else(|| derivation_failure(argument, "value has no scalar form".to_string())),
    }
}

fn derivation_failure(argument: &Argument, reason: String) -> CacheError {
    CacheError::DerivationFailure {
        argument: argument.name.clone(),
        reason,
    }
}
