//! # Pagination Module
//!
//! Page windows over a [`QueryBuilder`]: a `COUNT(*)` of the filtered query
//! followed by the page itself with `LIMIT`/`OFFSET` applied.

// ============================================================================
// External Crate Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    database::Connection,
    errors::Result,
    instance::Instance,
    model::Model,
    query_builder::QueryBuilder,
};

// ============================================================================
// Pagination Structs
// ============================================================================

/// One page of results together with the totals of the whole query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// The rows of the current page
    pub data: Vec<T>,
    /// Number of rows matching the query, ignoring the page window
    pub total: i64,
    /// The current page number (1-based)
    pub page: u64,
    /// Rows per page
    pub per_page: u64,
    /// Number of the last page (at least 1)
    pub last_page: u64,
}

impl<T> Paginated<T> {
    pub fn has_more_pages(&self) -> bool {
        self.page < self.last_page
    }

    /// Converts the rows while keeping the totals.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            last_page: self.last_page,
        }
    }
}

/// Pagination settings, typically deserialized from a request's query
/// string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number; 0 is treated as 1
    #[serde(default = "default_page")]
    pub page: u64,
    /// Rows per page
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Maximum allowed rows per page (safety limit)
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn default_max_per_page() -> u64 {
    100
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(default_page(), default_per_page())
    }
}

impl Pagination {
    /// Creates pagination settings with a custom safety limit. A `per_page`
    /// of 0 or above `max_per_page` falls back to `max_per_page`.
    pub fn new_with_limit(page: u64, per_page: u64, max_per_page: u64) -> Self {
        Self { page, per_page, max_per_page }.normalized()
    }

    /// Creates pagination settings with a safety limit of 100 rows.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self::new_with_limit(page, per_page, default_max_per_page())
    }

    /// Rows skipped before the current page, capped at `i64::MAX` so the
    /// rendered `OFFSET` stays a valid SQL integer.
    pub fn offset(&self) -> u64 {
        let this = self.normalized();
        (this.page - 1).saturating_mul(this.per_page).min(i64::MAX as u64)
    }

    /// Applies the page window to a query.
    pub fn apply<M, C>(self, query: QueryBuilder<M, C>) -> QueryBuilder<M, C>
    where
        M: Model,
        C: Connection + Clone,
    {
        let this = self.normalized();
        query.limit(this.per_page).offset(this.offset())
    }

    /// Counts the matching rows and fetches the requested page.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let page = Pagination::new(2, 20).paginate(db.model::<Post>().equals("published", true)).await?;
    /// println!("{} of {} posts", page.data.len(), page.total);
    /// ```
    pub async fn paginate<M, C>(self, mut query: QueryBuilder<M, C>) -> Result<Paginated<Instance<M>>>
    where
        M: Model,
        C: Connection + Clone,
    {
        let this = self.normalized();
        query.check()?;
        let total = query.duplicate().count().await?;
        let data = this.apply(query).fetch().await?;

        let pages = (total.max(0) as u64).div_ceil(this.per_page);
        Ok(Paginated { data, total, page: this.page, per_page: this.per_page, last_page: pages.max(1) })
    }

    fn normalized(mut self) -> Self {
        if self.max_per_page == 0 {
            self.max_per_page = default_max_per_page();
        }
        if self.page == 0 {
            self.page = 1;
        }
        if self.per_page == 0 || self.per_page > self.max_per_page {
            self.per_page = self.max_per_page;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_one_based() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
        assert_eq!(Pagination::new(0, 20).offset(), 0);
    }

    #[test]
    fn huge_page_numbers_saturate() {
        assert_eq!(Pagination::new(u64::MAX, 20).offset(), i64::MAX as u64);
        assert_eq!(Pagination::new(u64::MAX / 2, 100).offset(), i64::MAX as u64);
    }

    #[test]
    fn per_page_is_capped() {
        assert_eq!(Pagination::new(1, 500).per_page, 100);
        assert_eq!(Pagination::new_with_limit(1, 0, 50).per_page, 50);
    }

    #[test]
    fn deserializes_with_defaults() -> serde_json::Result<()> {
        let pagination: Pagination = serde_json::from_str(r#"{"page": 2}"#)?;
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.per_page, 20);
        Ok(())
    }
}
