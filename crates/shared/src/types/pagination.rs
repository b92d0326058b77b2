//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_size")]
    pub size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_size() -> u64 {
    10
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
        }
    }
}

impl PageRequest {
    /// Largest page size a caller may request.
    pub const MAX_SIZE: u64 = 100;

    /// Creates a page request, clamping page to at least 1 and size to `1..=MAX_SIZE`.
    #[must_use]
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Returns a copy with page and size clamped into their valid ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.page, self.size)
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.size
    }
}

/// Paging metadata in the wire format the frontend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Current page number.
    pub current_page: u64,
    /// Items per page.
    pub size: u64,
    /// Total number of pages (0 when there are no rows).
    pub total_page: u64,
}

impl Paging {
    /// Builds paging metadata from a request and the total row count.
    #[must_use]
    pub fn new(request: PageRequest, total: u64) -> Self {
        let total_page = if request.size == 0 {
            0
        } else {
            total.div_ceil(request.size)
        };

        Self {
            current_page: request.page,
            size: request.size,
            total_page,
        }
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub paging: Paging,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            data,
            paging: Paging::new(request, total),
        }
    }

    /// Maps the items while keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            data: self.data.into_iter().map(f).collect(),
            paging: self.paging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_page_request_default() {
        let request = PageRequest::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.size, 10);
    }

    #[test]
    fn test_page_request_offset() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(2, 20).offset(), 20);
        assert_eq!(PageRequest::new(3, 7).offset(), 14);
    }

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(0, 1000);
        assert_eq!(request.page, 1);
        assert_eq!(request.size, PageRequest::MAX_SIZE);

        let request = PageRequest { page: 0, size: 0 }.normalized();
        assert_eq!(request.page, 1);
        assert_eq!(request.size, 1);
    }

    #[rstest]
    #[case(0, 10, 0)]
    #[case(1, 10, 1)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    #[case(25, 10, 3)]
    fn test_total_page(#[case] total: u64, #[case] size: u64, #[case] expected: u64) {
        let paging = Paging::new(PageRequest::new(1, size), total);
        assert_eq!(paging.total_page, expected);
    }

    #[test]
    fn test_page_response_new() {
        let response = PageResponse::new(vec![1, 2, 3], PageRequest::new(2, 3), 9);

        assert_eq!(response.data, vec![1, 2, 3]);
        assert_eq!(response.paging.current_page, 2);
        assert_eq!(response.paging.size, 3);
        assert_eq!(response.paging.total_page, 3);
    }

    #[test]
    fn test_page_response_map_keeps_paging() {
        let response = PageResponse::new(vec![1, 2], PageRequest::new(1, 2), 4);
        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.data, vec![10, 20]);
        assert_eq!(mapped.paging.total_page, 2);
    }

    #[test]
    fn test_paging_wire_format() {
        let paging = Paging::new(PageRequest::new(1, 10), 5);
        let json = serde_json::to_value(paging).unwrap();
        assert_eq!(json["current_page"], 1);
        assert_eq!(json["size"], 10);
        assert_eq!(json["total_page"], 1);
    }
}
