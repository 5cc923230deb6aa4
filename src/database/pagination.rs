use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if rows.is_empty() && request.page == 1 {
            return Self::no_rows();
        }

        let last_page = ((total_rows + request.limit - 1) / request.limit).max(1);
        let next = (request.page < last_page).then_some(request.page + 1);
        let previous = (request.page > 1).then_some((request.page - 1).min(last_page));

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }
}

// Keeps `offset()` within i64 for every accepted page size.
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// 1-based page number and page size, clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}
