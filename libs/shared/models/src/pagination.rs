use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 25;

/// Page arithmetic shared by every paged listing: at least one page, and the
/// requested page is clamped into `1..=total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(requested_page: Option<i64>, page_size: i64, total_count: i64) -> Self {
        let page_size = page_size.max(1);
        let total_count = total_count.max(0);
        let total_pages = ((total_count + page_size - 1) / page_size).max(1);
        let page = requested_page.unwrap_or(1).clamp(1, total_pages);

        Self {
            page,
            page_size,
            total_count,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing_still_has_one_page() {
        let p = Pagination::new(Some(4), 25, 0);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn requested_page_is_clamped() {
        let p = Pagination::new(Some(9), 25, 51);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.page, 3);
        assert_eq!(p.offset(), 50);

        let p = Pagination::new(Some(-2), 25, 51);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn exact_multiple_does_not_add_a_page() {
        assert_eq!(Pagination::new(None, 25, 50).total_pages, 2);
        assert_eq!(Pagination::new(None, 200, 201).total_pages, 2);
    }
}
