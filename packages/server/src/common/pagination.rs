//! Offset pagination for list endpoints.
//!
//! List routes take `limit`/`offset` query parameters and report the
//! total row count back in response headers, so clients can page without a
//! wrapper envelope.

use thiserror::Error;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("limit must be between 1 and {MAX_LIMIT}")]
    LimitOutOfRange,
    #[error("offset must be greater than or equal to 0")]
    NegativeOffset,
}

/// Raw, unvalidated paging parameters as they arrive in a query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn validate(self) -> Result<OffsetPage, PageError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(PageError::LimitOutOfRange);
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(PageError::NegativeOffset);
        }
        Ok(OffsetPage { limit, offset })
    }
}

/// Validated page window, safe to bind into `LIMIT $n OFFSET $m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetPage {
    pub limit: i64,
    pub offset: i64,
}

impl Default for OffsetPage {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
