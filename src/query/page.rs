// src/query/page.rs
//! Offset/limit pagination with a total-count envelope

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::SelectQuery;
use crate::store::{Dataset, Table};

/// A requested page window. Both fields absent means "no pagination".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PageRequest {
    pub fn new(limit: impl Into<Option<u64>>, offset: impl Into<Option<u64>>) -> Self {
        Self {
            limit: limit.into(),
            offset: offset.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.limit.is_none() && self.offset.is_none()
    }
}

/// One page of results plus the counts a paging UI needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    /// Row count of the query before the window was applied.
    pub total_items: u64,
    /// Row count of this page (always `items.len()`).
    pub items_quantity: u64,
    /// The requested offset, 0 when none was given.
    pub items_offset: u64,
    pub items: Vec<T>,
}

impl<T: Table> SelectQuery<T> {
    /// Apply a page window. The query must be ordered first; an OFFSET
    /// over an unordered query returns rows in whatever order the engine
    /// feels like, so that is rejected here even when the window itself
    /// is a no-op.
    pub fn page(mut self, page: &PageRequest) -> Result<Self> {
        self.require_ordered("pagination")?;
        if let Some(offset) = page.offset {
            self.stmt.offset(offset);
            if page.limit.is_none() {
                // SQLite has no OFFSET without LIMIT
                self.stmt.limit(i64::MAX as u64);
            }
        }
        if let Some(limit) = page.limit {
            self.stmt.limit(limit);
        }
        Ok(self)
    }

    /// Count the un-windowed query, then fetch the requested page.
    pub fn fetch_paged(self, ds: &Dataset<'_>, page: &PageRequest) -> Result<Paged<T>> {
        self.require_ordered("pagination")?;
        let total_items = self.count(ds)?;
        let items = self.page(page)?.fetch_all(ds)?;
        Ok(Paged {
            total_items,
            items_quantity: items.len() as u64,
            items_offset: page.offset.unwrap_or(0),
            items,
        })
    }

    /// Wrap an already-windowed query. Nothing is applied to the
    /// statement; `page` only reports the offset and `total_items` comes
    /// from the caller (who knows the un-windowed count some other way).
    pub fn fetch_paged_with_total(
        self,
        ds: &Dataset<'_>,
        page: &PageRequest,
        total_items: u64,
    ) -> Result<Paged<T>> {
        let items = self.fetch_all(ds)?;
        Ok(Paged {
            total_items,
            items_quantity: items.len() as u64,
            items_offset: page.offset.unwrap_or(0),
            items,
        })
    }
}
