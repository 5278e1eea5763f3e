//! Search request and result page types

use crate::domain::view::SortOrder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page size used when the caller does not set one
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A caller-supplied search over one view
///
/// Offsets are zero-based; the caller validates that `page_size > 0` before
/// submitting. Bounds are kept ordered by name so the generated SQL is
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text filter applied to filterable columns
    pub filter: Option<String>,

    /// Named range/equality constraints, always pushed into SQL
    pub bounds: BTreeMap<String, String>,

    /// Field to sort by; the view's default ordering applies when absent
    pub sort_field: Option<String>,

    /// Direction for `sort_field`; ignored when `sort_field` is absent
    pub sort_order: SortOrder,

    /// Zero-based offset of the requested page
    pub page_offset: usize,

    /// Maximum rows in the returned page
    pub page_size: usize,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filter: None,
            bounds: BTreeMap::new(),
            sort_field: None,
            sort_order: SortOrder::default(),
            page_offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchRequest {
    /// Create a request with default paging and no constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text filter
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Add a named bound
    pub fn with_bound(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bounds.insert(name.into(), value.into());
        self
    }

    /// Set the sort field and direction
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = order;
        self
    }

    /// Set the page offset and size
    pub fn with_page(mut self, offset: usize, size: usize) -> Self {
        self.page_offset = offset;
        self.page_size = size;
        self
    }

    /// Whether a non-empty free-text filter is present
    pub fn has_filter(&self) -> bool {
        self.filter.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// Whether any bounds are present
    pub fn has_bounds(&self) -> bool {
        !self.bounds.is_empty()
    }
}

/// One page of results plus the total count over the filtered universe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<R> {
    /// The requested page, at most `page_size` records
    pub results: Vec<R>,

    /// Matches across the whole result set, not just this page
    pub total_count: i64,
}

impl<R> SearchResults<R> {
    pub fn new(results: Vec<R>, total_count: i64) -> Self {
        Self {
            results,
            total_count,
        }
    }

    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            total_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
