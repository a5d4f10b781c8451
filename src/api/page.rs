//! Pagination parameters and the paginated response envelope.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// `?page=&limit=` as accepted from the transport layer. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }.normalized()
    }

    /// Clamps `page` to at least 1 and `limit` to `1..=MAX_LIMIT`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> usize {
        let p = self.normalized();
        (p.page as usize - 1) * p.limit as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: usize, params: PageParams) -> Self {
        let params = params.normalized();
        let limit = params.limit as usize;
        Self {
            data,
            total,
            page: params.page,
            limit: params.limit,
            total_pages: total.div_ceil(limit),
        }
    }

    /// Slices one page out of an already filtered and ordered result set.
    pub fn slice(rows: Vec<T>, params: PageParams) -> Self {
        let total = rows.len();
        let params = params.normalized();
        let data = rows
            .into_iter()
            .skip(params.offset())
            .take(params.limit as usize)
            .collect();
        Self::new(data, total, params)
    }
}
