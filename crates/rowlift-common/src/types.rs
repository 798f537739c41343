//! Common types used across rowlift

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of items to return
    pub limit: i64,

    /// Number of items to skip
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Creates a new pagination instance with custom values.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    /// Creates pagination for a specific page with a given page size.
    ///
    /// ```
    /// use rowlift_common::types::Pagination;
    ///
    /// let page_2 = Pagination::page(2, 20);
    /// assert_eq!(page_2.offset, 40);
    /// assert_eq!(page_2.limit, 20);
    /// ```
    pub fn page(page: i64, page_size: i64) -> Self {
        Self {
            limit: page_size,
            offset: page * page_size,
        }
    }
}
