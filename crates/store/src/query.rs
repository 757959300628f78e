//! Filters and queries understood by every [`StoreBackend`].
//!
//! [`StoreBackend`]: crate::StoreBackend

use serde::Serialize;
use serde_json::Value;

/// Conjunction of field equality conditions.
///
/// Equality against an array-valued field matches membership, mirroring the
/// document-database convention the catalog relies on: `genre = <id>` finds
/// books whose genre list contains the id. An empty filter matches every
/// document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// Filter matching every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self::default().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Serialize) -> Self {
        // to_value is infallible for the scalar/id types used in filters.
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.conditions.push((field.into(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a raw document satisfies every condition.
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| match document.get(field) {
                Some(Value::Array(items)) => items.contains(expected),
                Some(actual) => actual == expected,
                None => false,
            })
    }
}

/// A filter plus an optional ascending sort key.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Filter,
    pub sort: Option<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sort results ascending by the given field.
    pub fn sort(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        let doc = json!({"title": "Dune"});
        assert!(Filter::all().matches(&doc));
    }

    #[test]
    fn scalar_equality() {
        let doc = json!({"status": "Available", "imprint": "Ace"});
        assert!(Filter::eq("status", "Available").matches(&doc));
        assert!(!Filter::eq("status", "Loaned").matches(&doc));
    }

    #[test]
    fn array_field_matches_on_membership() {
        let doc = json!({"genre": ["fantasy", "horror"]});
        assert!(Filter::eq("genre", "horror").matches(&doc));
        assert!(!Filter::eq("genre", "romance").matches(&doc));
    }

    #[test]
    fn missing_field_never_matches() {
        let doc = json!({"title": "Dune"});
        assert!(!Filter::eq("author", "someone").matches(&doc));
    }

    #[test]
    fn conjunction_requires_all_conditions() {
        let doc = json!({"status": "Loaned", "imprint": "Tor"});
        let filter = Filter::eq("status", "Loaned").and("imprint", "Tor");
        assert!(filter.matches(&doc));
        let filter = Filter::eq("status", "Loaned").and("imprint", "Ace");
        assert!(!filter.matches(&doc));
    }
}
