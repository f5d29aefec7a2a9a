use serde::Serialize;

/// Canonical pagination metadata.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Build metadata from raw numbers, deriving whatever the backend left out.
    ///
    /// `total_pages` is never below 1 and `page` is clamped into
    /// `[1, total_pages]`.
    pub fn normalized(
        page: u32,
        limit: u32,
        total: u64,
        total_pages: Option<u32>,
        has_next_page: Option<bool>,
        has_prev_page: Option<bool>,
    ) -> Self {
        let limit = limit.max(1);
        let total_pages = total_pages
            .unwrap_or_else(|| Self::page_count(total, limit))
            .max(1);
        let page = page.clamp(1, total_pages);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: has_next_page.unwrap_or(page < total_pages),
            has_prev_page: has_prev_page.unwrap_or(page > 1),
        }
    }

    /// `ceil(total / limit)`, at least 1.
    pub fn page_count(total: u64, limit: u32) -> u32 {
        let limit = u64::from(limit.max(1));
        let pages = total.div_ceil(limit).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// One page of records in canonical form.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_is_ceiling() {
        for limit in 1..=12u32 {
            for total in 0..=60u64 {
                let expected = ((total + u64::from(limit) - 1) / u64::from(limit)).max(1);
                assert_eq!(u64::from(Pagination::page_count(total, limit)), expected);
            }
        }
    }

    #[test]
    fn test_page_is_clamped() {
        let p = Pagination::normalized(9, 10, 15, None, None, None);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.page, 2);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::normalized(0, 10, 0, Some(0), None, None);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.page, 1);
        assert!(!p.has_prev_page);
    }

    #[test]
    fn test_explicit_flags_win() {
        let p = Pagination::normalized(1, 10, 15, Some(2), Some(false), Some(true));
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);
    }
}
