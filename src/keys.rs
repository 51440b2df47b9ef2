//! Cache Key Derivation
//!
//! Builds deterministic cache keys from normalized request parameters and
//! the substring patterns writers use to invalidate them.
//!
//! Key layout: `<resource>:list:page=<n>:limit=<n>:search=<json>:filters=<json>`
//! and `<resource>:item:<id>`. The search term and filters are JSON-encoded,
//! so separator characters inside them cannot make two queries share a key.
//! Every key of a resource starts with `<resource>:`, which is the
//! invalidation pattern for the whole family.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

/// Default page size for listings
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page size a caller may request
pub const MAX_LIMIT: u32 = 100;

// == List Query ==
/// Normalized listing parameters.
///
/// Filters live in a `BTreeMap` so two requests with the same effective
/// parameters serialize identically regardless of query-string order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            search: None,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    /// Builds a query from raw query-string parameters.
    ///
    /// `page`, `limit` and `search` are recognized; every other parameter is
    /// an equality filter. Unparseable numbers fall back to defaults, `page`
    /// is at least 1 and `limit` is clamped to `1..=MAX_LIMIT`. Search terms
    /// are trimmed and lowercased; blank ones are dropped.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let mut query = Self::default();

        for (name, value) in params {
            match name.as_str() {
                "page" => {
                    query.page = value.trim().parse::<u32>().unwrap_or(1).max(1);
                }
                "limit" => {
                    query.limit = value
                        .trim()
                        .parse::<u32>()
                        .unwrap_or(DEFAULT_LIMIT)
                        .clamp(1, MAX_LIMIT);
                }
                "search" => {
                    let term = value.trim().to_lowercase();
                    query.search = (!term.is_empty()).then_some(term);
                }
                _ => {
                    query.filters.insert(name.clone(), value.trim().to_string());
                }
            }
        }

        query
    }

    /// Offset of the first record on this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

// == Keys ==
/// Cache key of a listing request.
pub fn list_key(resource: &str, query: &ListQuery) -> String {
    let search = query.search.as_deref().map_or(Value::Null, Value::from);
    let filters: Map<String, Value> = query
        .filters
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(value.as_str())))
        .collect();

    format!(
        "{}:list:page={}:limit={}:search={}:filters={}",
        resource,
        query.page,
        query.limit,
        search,
        Value::Object(filters)
    )
}

/// Cache key of a single-record request.
pub fn item_key(resource: &str, id: u64) -> String {
    format!("{}:item:{}", resource, id)
}

/// Substring matching every cache key of `resource`.
pub fn resource_pattern(resource: &str) -> String {
    format!("{}:", resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let query = ListQuery::from_params(&HashMap::new());
        assert_eq!(query, ListQuery::default());
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_normalization() {
        let query = ListQuery::from_params(&params(&[
            ("page", "0"),
            ("limit", "5000"),
            ("search", "  Algebra "),
        ]));

        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_LIMIT);
        assert_eq!(query.search.as_deref(), Some("algebra"));
    }

    #[test]
    fn test_garbage_numbers_fall_back() {
        let query = ListQuery::from_params(&params(&[("page", "abc"), ("limit", "-3")]));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let query = ListQuery::from_params(&params(&[("search", "   ")]));
        assert!(query.search.is_none());
    }

    #[test]
    fn test_equivalent_requests_share_a_key() {
        let a = ListQuery::from_params(&params(&[
            ("level", "2"),
            ("teacher_id", "7"),
            ("search", "Math"),
        ]));
        let b = ListQuery::from_params(&params(&[
            ("teacher_id", "7"),
            ("search", "math "),
            ("level", "2"),
            ("page", "1"),
        ]));

        assert_eq!(list_key("courses", &a), list_key("courses", &b));
    }

    #[test]
    fn test_different_pages_differ() {
        let a = ListQuery::from_params(&params(&[("page", "1")]));
        let b = ListQuery::from_params(&params(&[("page", "2")]));
        assert_ne!(list_key("courses", &a), list_key("courses", &b));
    }

    #[test]
    fn test_key_layout() {
        let query = ListQuery::from_params(&params(&[("page", "3"), ("limit", "20"), ("room", "B")]));

        assert_eq!(
            list_key("classrooms", &query),
            r#"classrooms:list:page=3:limit=20:search=null:filters={"room":"B"}"#
        );
        assert_eq!(query.offset(), 40);
        assert_eq!(item_key("classrooms", 12), "classrooms:item:12");
    }

    #[test]
    fn test_separators_inside_filter_values_do_not_collide() {
        // ?level=1&room=B versus ?level=1%26room%3DB
        let two_filters = ListQuery::from_params(&params(&[("level", "1"), ("room", "B")]));
        let one_filter = ListQuery::from_params(&params(&[("level", "1&room=B")]));

        assert_ne!(list_key("courses", &two_filters), list_key("courses", &one_filter));
    }

    #[test]
    fn test_separators_inside_search_do_not_collide() {
        let with_filter = ListQuery::from_params(&params(&[("search", "math"), ("room", "b")]));
        let search_only = ListQuery::from_params(&params(&[("search", "math:filters=room=b")]));

        assert_ne!(list_key("courses", &with_filter), list_key("courses", &search_only));
    }

    #[test]
    fn test_quotes_in_values_are_escaped() {
        let query = ListQuery::from_params(&params(&[("name", r#"a","b":"c"#)]));
        let key = list_key("teachers", &query);

        assert!(key.ends_with(r#"filters={"name":"a\",\"b\":\"c"}"#), "{}", key);
    }

    #[test]
    fn test_pattern_covers_resource_family_only() {
        let pattern = resource_pattern("levels");
        let query = ListQuery::default();

        assert!(list_key("levels", &query).contains(&pattern));
        assert!(item_key("levels", 1).contains(&pattern));
        assert!(!list_key("courses", &query).contains(&pattern));
    }
}
