//! Pagination parameters and result pages for listing endpoints.

use serde::{Deserialize, Serialize};
use std::cmp::min;

use crate::options::QueryOptions;

/// One page of a larger result set, with navigation metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total item count across all pages.
    pub count: usize,
    /// Next page number, when one exists.
    pub next_page: Option<usize>,
    /// Previous page number, when this is not the first page.
    pub previous_page: Option<usize>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Page {
            items: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

/// Which page to fetch and how many items per page. Pages are 1-indexed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PaginationParams {
    pub page: usize,
    pub per_page: usize,
}

impl PaginationParams {
    pub fn new(page: usize, per_page: usize) -> Self {
        PaginationParams { page, per_page }
    }

    /// Number of items to skip for this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.per_page
    }

    /// Query options staging this page's window.
    pub fn options(&self) -> QueryOptions {
        QueryOptions::with_pagination(self.offset() as u64, self.per_page as i64)
    }

    /// Slices an already-fetched item list into a page with navigation
    /// metadata.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        if items.is_empty() || self.offset() >= items.len() {
            return Page::default();
        }

        let total = items.len();
        let end = min(self.offset() + self.per_page, total);
        let slice = items
            .into_iter()
            .skip(self.offset())
            .take(self.per_page)
            .collect();

        Page {
            items: slice,
            count: total,
            next_page: (end < total).then(|| self.page + 1),
            previous_page: (self.page > 1).then(|| self.page - 1),
        }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        PaginationParams { page: 1, per_page: 10 }
    }
}
