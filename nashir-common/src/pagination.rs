//! Pagination utilities for offset-based list endpoints
//!
//! Page sizes are not fixed here; each endpoint reads its own size from
//! the settings table (`feed_page_size`, `admin_page_size`,
//! `chat_page_size`) and passes it in.

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
    /// Rows per page
    pub page_size: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Arguments
/// * `total_results` - Total number of rows in result set
/// * `requested_page` - Page number requested by user (may be out of bounds)
/// * `page_size` - Rows per page (values below 1 are treated as 1)
///
/// # Examples
/// ```
/// use nashir_common::pagination::calculate_pagination;
///
/// // 50 total results at 20/page = 3 pages (20 + 20 + 10)
/// let p = calculate_pagination(50, 2, 20);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(50, 99, 20);
/// assert_eq!(p.page, 3);  // Clamped to last page
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = (total_results + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        total_pages,
        offset,
        page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(50, 2, 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_pagination_first_page() {
        let p = calculate_pagination(30, 1, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(30, 99, 20);
        assert_eq!(p.page, 2); // Clamped to last page
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(30, 0, 20);
        assert_eq!(p.page, 1); // Clamped to first page
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(40, 2, 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_degenerate_page_size() {
        let p = calculate_pagination(5, 1, 0);
        assert_eq!(p.page_size, 1);
        assert_eq!(p.total_pages, 5);
    }
}
