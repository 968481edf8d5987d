//! Pagination types shared by the storage and HTTP layers

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRequestError {
    #[error("page_number must be at least 1")]
    InvalidPageNumber,
    #[error("page_size must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize,
}

/// A validated, 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Result<Self, PageRequestError> {
        if page_number == 0 {
            return Err(PageRequestError::InvalidPageNumber);
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PageRequestError::InvalidPageSize);
        }
        Ok(Self {
            page_number,
            page_size,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip before this page starts
    pub fn offset(&self) -> i64 {
        (self.page_number as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the totals needed to navigate the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        let page_size = request.page_size() as u64;
        Self {
            items,
            page_number: request.page_number(),
            page_size: request.page_size(),
            total_count,
            total_pages: total_count.div_ceil(page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
