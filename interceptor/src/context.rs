//! Invocation context
//!
//! What the interception layer knows about one call: whose operation it is,
//! its name, and its arguments in declaration order. Built fresh per call and
//! never stored.

use type_mapping::{ArgValue, Arguments, ToArguments};

/// One invocation of a cacheable or invalidating operation
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    /// Entity or controller name the operation belongs to
    pub target_identity: String,
    pub operation_name: String,
    pub arguments: Arguments,
}

impl InvocationContext {
    pub fn new(target_identity: impl Into<String>, operation_name: impl Into<String>) -> Self {
        Self {
            target_identity: target_identity.into(),
            operation_name: operation_name.into(),
            arguments: Arguments::new(),
        }
    }

    /// Context whose target identity is inferred from `T`'s name
    pub fn for_target<T: ?Sized>(operation_name: impl Into<String>) -> Self {
        Self::new(target_identity_of::<T>(), operation_name)
    }

    pub fn with_arguments(mut self, arguments: impl ToArguments) -> Self {
        self.arguments = arguments.to_arguments();
        self
    }

    /// Append one argument
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.arguments = self.arguments.with(name, value);
        self
    }
}

/// Stable name of a registered operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationId {
    pub target_identity: String,
    pub operation_name: String,
}

impl OperationId {
    pub fn new(target_identity: impl Into<String>, operation_name: impl Into<String>) -> Self {
        Self {
            target_identity: target_identity.into(),
            operation_name: operation_name.into(),
        }
    }

    /// Operation of `T`, target identity inferred from the type name
    pub fn of<T: ?Sized>(operation_name: impl Into<String>) -> Self {
        Self::new(target_identity_of::<T>(), operation_name)
    }

    pub fn context(&self, arguments: impl ToArguments) -> InvocationContext {
        InvocationContext::new(&self.target_identity, &self.operation_name).with_arguments(arguments)
    }
}

/// Entity name for a type: last path segment, generics dropped, a trailing
/// `Controller` removed (`app::api::StudentController` -> `Student`)
pub fn target_identity_of<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    let name = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);

    match name.strip_suffix("Controller") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => name.to_string(),
    }
}
