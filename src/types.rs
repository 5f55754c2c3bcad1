//! Shared types serialized between the upload client, the HTTP surface and
//! the persisted document. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded image plus its metadata.
///
/// `url` and `thumbnail_url` are self-describing data-URIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub filename: String,
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: String,
    pub url: String,
    pub thumbnail_url: String,
}

/// Default page size for gallery listings.
pub const DEFAULT_LIMIT: usize = 50;

/// A validated page request. Both fields are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl PageRequest {
    /// Build a request, clamping zero values up to 1.
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Half-open index range `[start, end)` this page covers.
    pub fn bounds(&self) -> (usize, usize) {
        let start = (self.page - 1).saturating_mul(self.limit);
        (start, start.saturating_add(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_LIMIT)
    }
}

/// Pagination metadata, derived at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn compute(request: PageRequest, total: usize) -> Self {
        let (_, end) = request.bounds();
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(request.limit),
            has_next: end < total,
            has_prev: request.page > 1,
        }
    }

    /// Zeroed metadata used when the backing store cannot be read.
    pub fn empty(request: PageRequest) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total: 0,
            total_pages: 0,
            has_next: false,
            has_prev: false,
        }
    }
}

/// One page of the gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoPage {
    pub photos: Vec<Photo>,
    pub pagination: Pagination,
}

impl PhotoPage {
    /// Slice `all` (newest first) according to `request`.
    pub fn slice(all: &[Photo], request: PageRequest) -> Self {
        let (start, end) = request.bounds();
        let photos = if start >= all.len() {
            Vec::new()
        } else {
            all[start..end.min(all.len())].to_vec()
        };
        Self {
            photos,
            pagination: Pagination::compute(request, all.len()),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self {
            photos: Vec::new(),
            pagination: Pagination::empty(request),
        }
    }
}
