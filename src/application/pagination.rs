//! Shared offset pagination helpers.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// One page of results together with the totals the client needs to keep
/// paginating. The whole structure is the unit of collection caching: a page
/// is cached and invalidated as one entry, never item by item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            has_next_page: has_next_page(total, page, limit),
        }
    }

    pub fn empty(page: u32, limit: u32) -> Self {
        Self::new(Vec::new(), 0, page, limit)
    }

    /// Map the items while keeping the page envelope intact.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            has_next_page: self.has_next_page,
        }
    }
}

fn has_next_page(total: u64, page: u32, limit: u32) -> bool {
    u64::from(page) * u64::from(limit) < total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_next_page_arithmetic() {
        // total=25, limit=10: pages 1 and 2 have more, page 3 is the last.
        assert!(has_next_page(25, 1, 10));
        assert!(has_next_page(25, 2, 10));
        assert!(!has_next_page(25, 3, 10));
    }

    #[test]
    fn exact_boundary_has_no_next_page() {
        assert!(!has_next_page(20, 2, 10));
    }

    #[test]
    fn empty_page_keeps_requested_coordinates() {
        let page: Page<i64> = Page::empty(4, 25);
        assert_eq!(page.page, 4);
        assert_eq!(page.limit, 25);
        assert_eq!(page.total, 0);
        assert!(!page.has_next_page);
    }

    #[test]
    fn map_preserves_envelope() {
        let page = Page::new(vec![1, 2, 3], 13, 2, 3);
        let mapped = page.map(|n| n.to_string());
        assert_eq!(mapped.items, vec!["1", "2", "3"]);
        assert_eq!(mapped.total, 13);
        assert!(mapped.has_next_page);
    }
}
