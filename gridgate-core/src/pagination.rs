//! Page slicing over a sorted view.

use serde::Serialize;
use std::num::NonZeroUsize;

/// Number of pages needed for `total` records, never less than one.
pub fn page_count(total: usize, page_size: NonZeroUsize) -> usize {
    total.div_ceil(page_size.get()).max(1)
}

/// Clamp a 1-based page number into `[1, page_count]`.
pub fn clamp_page(page: usize, total: usize, page_size: NonZeroUsize) -> usize {
    page.clamp(1, page_count(total, page_size))
}

/// One page of a sorted view.
#[derive(Debug, Serialize)]
pub struct Page<'s, T> {
    pub items: &'s [T],

    /// The clamped page number this slice belongs to.
    pub page: usize,

    pub page_size: NonZeroUsize,
    pub total: usize,
    pub page_count: usize,
}

impl<T> Page<'_, T> {
    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 1-based index of the first item on this page, or 0 when empty.
    pub fn first_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.page_size.get() + 1
        }
    }
}

/// Slice `sorted` to the requested page, clamping the page number first.
pub fn paginate<T>(sorted: &[T], page: usize, page_size: NonZeroUsize) -> Page<'_, T> {
    let total = sorted.len();
    let page = clamp_page(page, total, page_size);
    let start = ((page - 1) * page_size.get()).min(total);
    let end = (start + page_size.get()).min(total);

    Page {
        items: &sorted[start..end],
        page,
        page_size,
        total,
        page_count: page_count(total, page_size),
    }
}
