//! Unified mapping between Rust values and operation arguments
//! This crate provides the argument model used across the cachehaus ecosystem

pub mod arguments;
pub mod serialize;
pub mod types;

pub use arguments::{Argument, Arguments, QueryFilter, ToArguments};
pub use serialize::{serialize_to_arg_value, serialize_to_filter};
pub use types::ArgValue;
