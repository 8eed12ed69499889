//! Offset pagination shared by listing services and the listing cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::question::CacheableRecord;
use crate::domain::types::QuestionId;

/// Validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Validate `page` (>= 1) and `size` (1..=`max_size`).
    pub fn new(page: u32, size: u32, max_size: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        if size == 0 || size > max_size {
            return Err(PaginationError::InvalidSize { size, max: max_size });
        }
        Ok(Self { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of rows to skip in the backing query.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }
}

/// One page of results, as stored in the cache and returned to callers.
///
/// Field names are part of the cached payload format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub current: u32,
    pub size: u32,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, total: u64, current: u32, size: u32) -> Self {
        Self {
            records,
            total,
            current,
            size,
        }
    }

    pub fn empty(current: u32, size: u32) -> Self {
        Self::new(Vec::new(), 0, current, size)
    }

    pub fn pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }
}

impl<T: CacheableRecord> Page<T> {
    pub fn entity_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.records.iter().map(CacheableRecord::entity_id)
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("page size {size} is outside 1..={max}")]
    InvalidSize { size: u32, max: u32 },
}
