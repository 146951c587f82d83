//! Ordered argument lists
//!
//! An operation's arguments are captured as `(name, value)` pairs in
//! declaration order.

use crate::serialize::{serialize_to_arg_value, serialize_to_filter};
use crate::types::ArgValue;
use serde::Serialize;

/// Marker for argument types that describe a query: paging, sorting or
/// filtering. Arguments of these types are keyed by a content hash of their
/// canonical form.
///
/// ```rust
/// use serde::Serialize;
/// use type_mapping::{Arguments, QueryFilter};
///
/// #[derive(Serialize)]
/// struct LoadOptions {
///     skip: u32,
///     take: u32,
/// }
///
/// impl QueryFilter for LoadOptions {}
///
/// let args = Arguments::new().with_filter("options", &LoadOptions { skip: 0, take: 20 });
/// assert!(args.iter().any(|arg| arg.value.is_filter()));
/// ```
pub trait QueryFilter: Serialize {}

/// A single named argument
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: ArgValue,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Arguments of one invocation, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value with a direct conversion
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.push(Argument::new(name, value));
        self
    }

    /// Add any serializable value; structs and collections become objects
    pub fn with_value<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.push(Argument {
            name: name.into(),
            value: serialize_to_arg_value(value),
        });
        self
    }

    /// Add a query/filter descriptor
    pub fn with_filter<F: QueryFilter + ?Sized>(mut self, name: impl Into<String>, filter: &F) -> Self {
        self.push(Argument {
            name: name.into(),
            value: serialize_to_filter(filter),
        });
        self
    }

    pub fn push(&mut self, argument: Argument) {
        self.items.push(argument);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Argument> {
        self.items.first()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Argument> for Arguments {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Trait for converting an operation's input into its argument list
pub trait ToArguments {
    fn to_arguments(&self) -> Arguments;
}

impl ToArguments for () {
    fn to_arguments(&self) -> Arguments {
        Arguments::new()
    }
}

impl ToArguments for Arguments {
    fn to_arguments(&self) -> Arguments {
        self.clone()
    }
}

impl<T: ToArguments + ?Sized> ToArguments for &T {
    fn to_arguments(&self) -> Arguments {
        (**self).to_arguments()
    }
}
