//! Visible row window computed from pagination state.

use std::ops::Range;

/// One-based, inclusive row window of the current page.
///
/// `end` never exceeds the row count, so an empty table yields `end == 0`.
/// Pages past the last one are not clamped: their `start` lies beyond `end`
/// and the window selects no rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    /// `start = (page - 1) * per_page + 1`, `end = min(start + per_page - 1, total_rows)`.
    ///
    /// `current_page` is treated as at least 1.
    pub fn compute(total_rows: usize, current_page: usize, items_per_page: usize) -> Self {
        let start = current_page.max(1).saturating_sub(1).saturating_mul(items_per_page).saturating_add(1);
        let end = start.saturating_add(items_per_page).saturating_sub(1).min(total_rows);
        Self { start, end }
    }

    /// Zero-based index range into the row list; empty when the page holds no rows.
    pub fn index_range(&self) -> Range<usize> {
        if self.end >= self.start {
            (self.start - 1)..self.end
        } else {
            0..0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Number of pages needed to show `total_rows`; at least 1.
pub fn page_count(total_rows: usize, items_per_page: usize) -> usize {
    if items_per_page == 0 {
        return 1;
    }
    total_rows.div_ceil(items_per_page).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agtable_types::ITEMS_PER_PAGE_OPTIONS;

    #[test]
    fn last_partial_page() {
        let window = PageWindow::compute(23, 3, 10);
        assert_eq!(window, PageWindow { start: 21, end: 23 });
        assert_eq!(window.index_range(), 20..23);
    }

    #[test]
    fn full_first_page() {
        assert_eq!(PageWindow::compute(23, 1, 10), PageWindow { start: 1, end: 10 });
        assert_eq!(PageWindow::compute(23, 1, 10).index_range(), 0..10);
    }

    #[test]
    fn empty_table() {
        let window = PageWindow::compute(0, 1, 10);
        assert_eq!(window, PageWindow { start: 1, end: 0 });
        assert!(window.is_empty());
        assert_eq!(window.index_range(), 0..0);
    }

    #[test]
    fn page_beyond_data_is_not_clamped() {
        let window = PageWindow::compute(23, 5, 10);
        assert_eq!(window, PageWindow { start: 41, end: 23 });
        assert!(window.is_empty());
        assert_eq!(window.index_range(), 0..0);
    }

    #[test]
    fn window_formula_holds_for_all_page_sizes() {
        for items_per_page in ITEMS_PER_PAGE_OPTIONS {
            for total_rows in [0usize, 1, 7, 23, 199, 1000] {
                for current_page in 1..=6 {
                    let window = PageWindow::compute(total_rows, current_page, items_per_page);
                    let start = (current_page - 1) * items_per_page + 1;
                    assert_eq!(window.start, start);
                    assert_eq!(window.end, (start + items_per_page - 1).min(total_rows));
                    assert!(window.index_range().len() <= items_per_page);
                    if total_rows == 0 && current_page == 1 {
                        assert!(window.end + 1 >= window.start);
                    }
                }
            }
        }
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(23, 10), 3);
        assert_eq!(page_count(20, 10), 2);
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(5, 0), 1);
    }
}
