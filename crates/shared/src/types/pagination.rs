//! Cursor pagination types for remote list queries.

use serde::{Deserialize, Serialize};

/// Request parameters for one page of a cursor-paginated query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of items to return.
    #[serde(default = "default_first")]
    pub first: u32,
    /// Cursor returned by the previous page, `None` for the first page.
    #[serde(default)]
    pub after: Option<String>,
}

fn default_first() -> u32 {
    100
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            first: default_first(),
            after: None,
        }
    }
}

impl PageRequest {
    /// First page with the given size. A size of zero is raised to one.
    #[must_use]
    pub fn first(first: u32) -> Self {
        Self {
            first: first.max(1),
            after: None,
        }
    }

    /// Request for the page following `cursor`, keeping the page size.
    #[must_use]
    pub fn next(&self, cursor: String) -> Self {
        Self {
            first: self.first,
            after: Some(cursor),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Cursor of the last item, present only when more pages follow.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Creates a page. `next_cursor` is dropped when `has_next_page` is false.
    #[must_use]
    pub fn new(items: Vec<T>, has_next_page: bool, end_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor: if has_next_page { end_cursor } else { None },
        }
    }

    /// A final page with no successor.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// Returns true if more pages follow.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }
}
