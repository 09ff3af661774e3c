//! Page-number pagination for list endpoints.

use crate::error::CoreError;

/// Default page number when the caller omits `page`.
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size when the caller omits `per_page`.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Largest page size a caller may request.
pub const MAX_PER_PAGE: i64 = 100;

/// A validated `(page, per_page)` pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Build a page request, applying defaults and rejecting non-positive values.
    ///
    /// `per_page` is capped at [`MAX_PER_PAGE`].
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, CoreError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page < 1 {
            return Err(CoreError::Validation(
                "page must be a positive integer".into(),
            ));
        }
        if per_page < 1 {
            return Err(CoreError::Validation(
                "per_page must be a positive integer".into(),
            ));
        }
        Ok(Self {
            page,
            per_page: per_page.min(MAX_PER_PAGE),
        })
    }

    /// Row offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Number of pages needed to show `total` items (0 when there are none).
    pub fn page_count(&self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.per_page - 1) / self.per_page
        }
    }
}
