//! Paging over a session's event log.

use serde::Serialize;

use super::{Event, Session};
use crate::store::Window;

/// Page used when the caller gives none.
pub const DEFAULT_PAGE: u64 = 1;
/// Page size used when the caller gives none.
pub const DEFAULT_LIMIT: u64 = 50;

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Storage window for this page. Page 0 is treated as page 1.
    pub fn window(&self) -> Window {
        Window {
            skip: self.page.saturating_sub(1).saturating_mul(self.limit),
            limit: self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

/// Pagination metadata returned alongside a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    /// Events in the whole session, not just this page.
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_pages = if request.limit == 0 {
            0
        } else {
            total.div_ceil(request.limit)
        };
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages,
        }
    }
}

/// Session snapshot plus one page of its events.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPage {
    pub session: Session,
    pub events: Vec<Event>,
    pub pagination: Pagination,
}
