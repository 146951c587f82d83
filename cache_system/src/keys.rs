//! Cache key construction
//!
//! Keys have the shape `{namespace}:{entity}:{operation}:{suffix}`. They are
//! lower-cased as a whole and no segment ever contains the `:` delimiter, so
//! `{namespace}:{entity}:` selects exactly one entity's keys.

use std::fmt::Display;

/// Identifier substituted when a key has no identifiers
pub const ALL_SENTINEL: &str = "all";

/// Segment delimiter
pub const DELIMITER: char = ':';

/// Deterministic builder for namespaced cache keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    namespace: String,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `{namespace}:{entity}:{operation}:{id1}:{id2}...`, or `...:all` with no identifiers
    pub fn build<I, S>(&self, entity: &str, operation: &str, identifiers: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: Display,
    {
        let mut key = self.operation_key(entity, operation);

        let mut any = false;
        for id in identifiers {
            key.push(DELIMITER);
            key.push_str(&escape_segment(&id.to_string()));
            any = true;
        }
        if !any {
            key.push(DELIMITER);
            key.push_str(ALL_SENTINEL);
        }

        key.to_lowercase()
    }

    /// Key for an operation with a derived parameter suffix.
    ///
    /// `suffix` comes from the parameter deriver and is either empty or starts
    /// with the delimiter; an empty suffix falls back to the `all` sentinel.
    pub fn build_with_suffix(&self, entity: &str, operation: &str, suffix: &str) -> String {
        if suffix.is_empty() {
            return self.build(entity, operation, std::iter::empty::<&str>());
        }

        let mut key = self.operation_key(entity, operation);
        key.push_str(suffix);
        key.to_lowercase()
    }

    /// `{namespace}:{entity}`, the invalidation prefix of one entity
    pub fn entity_prefix(&self, entity: &str) -> String {
        format!(
            "{}{}{}",
            escape_segment(&self.namespace),
            DELIMITER,
            escape_segment(entity)
        )
        .to_lowercase()
    }

    fn operation_key(&self, entity: &str, operation: &str) -> String {
        let mut key = self.entity_prefix(entity);
        key.push(DELIMITER);
        key.push_str(&escape_segment(operation));
        key
    }
}

/// Percent-encode `%` and `:` so a value can never introduce a delimiter
pub fn escape_segment(segment: &str) -> String {
    if !segment.contains(['%', DELIMITER]) {
        return segment.to_string();
    }

    let mut escaped = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            DELIMITER => escaped.push_str("%3a"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// SCAN pattern selecting every key under `prefix`.
///
/// Glob metacharacters in the prefix are escaped, and a trailing delimiter is
/// added so `eiu:student` never matches `eiu:student2:...`.
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    if !pattern.ends_with(DELIMITER) {
        pattern.push(DELIMITER);
    }
    pattern.push('*');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_without_identifiers_uses_sentinel() {
        let keys = KeyBuilder::new("eiu");
        assert_eq!(
            keys.build("student", "list", std::iter::empty::<&str>()),
            "eiu:student:list:all"
        );
    }

    #[test]
    fn test_build_with_identifiers() {
        let keys = KeyBuilder::new("EIU");
        assert_eq!(keys.build("Student", "Get", [42]), "eiu:student:get:42");
        assert_eq!(
            keys.build("student", "byCourse", ["CS101", "2024"]),
            "eiu:student:bycourse:cs101:2024"
        );
    }

    #[test]
    fn test_identifiers_cannot_inject_delimiters() {
        let keys = KeyBuilder::new("eiu");
        assert_eq!(keys.build("student", "get", ["a:b"]), "eiu:student:get:a%3ab");
        assert_ne!(
            keys.build("student", "get", ["a:b"]),
            keys.build("student", "get", ["a", "b"])
        );
    }

    #[test]
    fn test_build_with_suffix() {
        let keys = KeyBuilder::new("eiu");
        assert_eq!(
            keys.build_with_suffix("student", "find", ":id-42:name-math"),
            "eiu:student:find:id-42:name-math"
        );
        assert_eq!(keys.build_with_suffix("student", "list", ""), "eiu:student:list:all");
    }

    #[test]
    fn test_entity_prefix() {
        let keys = KeyBuilder::new("eiu");
        assert_eq!(keys.entity_prefix("Student"), "eiu:student");
    }

    #[test]
    fn test_prefix_pattern_isolates_entities() {
        assert_eq!(prefix_pattern("eiu:student"), "eiu:student:*");
        assert_eq!(prefix_pattern("eiu:student:"), "eiu:student:*");
        assert_eq!(prefix_pattern("eiu:st*r"), "eiu:st\\*r:*");
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic(
            ns in "[a-zA-Z0-9_]{1,8}",
            entity in "[a-zA-Z0-9:_%]{1,12}",
            operation in "[a-zA-Z0-9_]{1,12}",
            ids in proptest::collection::vec("[a-zA-Z0-9:%-]{0,8}", 0..4),
        ) {
            let keys = KeyBuilder::new(ns);
            let first = keys.build(&entity, &operation, &ids);
            let second = keys.build(&entity, &operation, &ids);
            prop_assert_eq!(&first, &second);
            let expected = format!("{}:", keys.entity_prefix(&entity));
            prop_assert!(first.starts_with(&expected));
        }
    }
}
