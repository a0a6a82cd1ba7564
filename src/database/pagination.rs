use serde::{Deserialize, Serialize};

use crate::constants::MAX_PAGE_SIZE;

/// Page-number pagination. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Saturates instead of overflowing for absurd page numbers.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(results: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        if results.is_empty() && total_rows <= 0 {
            return Self::no_rows();
        }

        let next = if request.page.saturating_mul(request.limit) < total_rows {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results,
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

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, 1, 10)]
    #[case(Some(0), Some(500), 1, 100)]
    #[case(Some(3), Some(6), 3, 6)]
    fn test_request_bounds(
        #[case] page: Option<i64>,
        #[case] limit: Option<i64>,
        #[case] expected_page: i64,
        #[case] expected_limit: i64,
    ) {
        let request = PageRequest::new(page, limit, 10);
        assert_eq!(request.page, expected_page);
        assert_eq!(request.limit, expected_limit);
    }

    #[rstest]
    fn test_middle_page() {
        let request = PageRequest::new(Some(2), Some(10), 10);
        let page = Page::from_rows(vec![1; 10], 35, request);

        assert_eq!(request.offset(), 10);
        assert_eq!(page.count, 35);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[rstest]
    fn test_last_page() {
        let page = Page::from_rows(vec![1; 5], 35, PageRequest::new(Some(4), Some(10), 10));
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));
    }

    #[rstest]
    #[case(i64::MAX, 100, i64::MAX)]
    #[case(i64::MAX, 1, i64::MAX - 1)]
    #[case(i64::MAX / 2, 10, i64::MAX)]
    fn test_extreme_page_saturates(#[case] page: i64, #[case] limit: i64, #[case] offset: i64) {
        let request = PageRequest::new(Some(page), Some(limit), 10);
        assert_eq!(request.offset(), offset);

        let page = Page::from_rows(vec![1], 35, request);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(request.page - 1));
    }

    #[rstest]
    fn test_no_rows() {
        let page: Page<i32> = Page::from_rows(vec![], 0, PageRequest::new(None, None, 10));
        assert_eq!(page, Page::no_rows());
    }
}
