//! Query options value type and its factory presets.
//!
//! [`QueryOptions`] is a pure value: each preset fills unspecified fields
//! with fixed defaults (skip 0, limit 10,000, sort/projection/collation
//! unset). No validation is performed; callers are responsible for passing
//! sane values.

use bson::Document;

/// Default ceiling applied to multi-result queries instead of "unlimited".
pub const DEFAULT_LIMIT: i64 = 10_000;

/// Default limit for the pagination preset.
pub const DEFAULT_PAGE_LIMIT: i64 = 1_000;

/// Immutable configuration for a staged query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Field inclusion/exclusion mapping handed to the store.
    pub projection: Option<Document>,
    /// Number of documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return.
    pub limit: i64,
    /// Ordered field → direction pairs (1 ascending, -1 descending).
    pub sort: Option<Document>,
    /// Collation locale; strength is fixed when handed to the store.
    pub collation: Option<String>,
}

impl QueryOptions {
    /// Full constructor; unspecified fields keep their defaults.
    pub fn init(
        projection: Option<Document>,
        skip: u64,
        limit: i64,
        sort: Option<Document>,
    ) -> Self {
        QueryOptions { projection, skip, limit, sort, collation: None }
    }

    /// Options with only a sort spec.
    pub fn with_sort(sort: Document) -> Self {
        QueryOptions { sort: Some(sort), ..QueryOptions::default() }
    }

    /// Options with only a projection.
    pub fn with_projection(projection: Document) -> Self {
        QueryOptions { projection: Some(projection), ..QueryOptions::default() }
    }

    /// Options with only skip and limit.
    pub fn with_pagination(skip: u64, limit: i64) -> Self {
        QueryOptions { skip, limit, ..QueryOptions::default() }
    }

    /// Options with only a collation locale.
    pub fn with_collation(locale: impl Into<String>) -> Self {
        QueryOptions { collation: Some(locale.into()), ..QueryOptions::default() }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            projection: None,
            skip: 0,
            limit: DEFAULT_LIMIT,
            sort: None,
            collation: None,
        }
    }
}
