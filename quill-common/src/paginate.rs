//! Splitting ordered listings into fixed-size pages.
//!
//! Page numbers are 1-based. A missing or non-numeric page request falls back
//! to the first page, a number outside the valid range falls back to the last
//! page. An empty listing has exactly one (empty) page.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = NonZeroU32::new(10).unwrap();

/// The `?page=` query parameter, kept raw so garbage input can fall back to page one.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    #[must_use]
    pub fn number(number: u64) -> Self {
        Self {
            page: Some(number.to_string()),
        }
    }

    fn requested(&self) -> Option<i64> {
        self.page.as_deref().and_then(|page| page.trim().parse().ok())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Paginator {
    page_size: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    #[must_use]
    pub fn new(page_size: NonZeroU32) -> Self {
        Self { page_size }
    }

    #[must_use]
    pub fn page_size(self) -> NonZeroU32 {
        self.page_size
    }

    /// Number of pages needed to display `count` items, never less than one.
    #[must_use]
    pub fn num_pages(self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.page_size.get())).max(1)
    }

    /// Picks the page to show for `query` out of `count` items.
    #[must_use]
    pub fn window(self, count: u64, query: &PageQuery) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match query.requested() {
            None => 1,
            Some(requested) => u64::try_from(requested)
                .ok()
                .filter(|requested| (1..=num_pages).contains(requested))
                .unwrap_or(num_pages),
        };
        let limit = u64::from(self.page_size.get());

        PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * limit,
            limit,
        }
    }
}

/// Which slice of a listing a page covers.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Wraps the items fetched for this window.
    ///
    /// Items past `limit` are dropped.
    #[must_use]
    pub fn into_page<T>(self, mut items: Vec<T>) -> Page<T> {
        items.truncate(usize::try_from(self.limit).unwrap_or(usize::MAX));

        let has_next = self.number < self.num_pages;
        let has_previous = self.number > 1;
        let start_index = if items.is_empty() { 0 } else { self.offset + 1 };

        Page {
            object_list: items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(self.number + 1),
            previous_page_number: has_previous.then(|| self.number - 1),
            start_index,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    /// 1-based position of the first item in the whole listing, 0 when empty.
    pub start_index: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::paginate::{PageQuery, Paginator};
    use std::num::NonZeroU32;

    fn paginator(size: u32) -> Paginator {
        Paginator::new(NonZeroU32::new(size).unwrap())
    }

    fn query(page: &str) -> PageQuery {
        PageQuery {
            page: Some(page.to_owned()),
        }
    }

    #[test]
    fn num_pages() {
        let paginator = paginator(10);
        assert_eq!(paginator.num_pages(0), 1);
        assert_eq!(paginator.num_pages(1), 1);
        assert_eq!(paginator.num_pages(10), 1);
        assert_eq!(paginator.num_pages(11), 2);
        assert_eq!(paginator.num_pages(13), 2);
        assert_eq!(paginator.num_pages(30), 3);
    }

    #[test]
    fn windows() {
        let paginator = paginator(10);

        let first = paginator.window(13, &PageQuery::default());
        assert_eq!((first.number, first.offset, first.limit), (1, 0, 10));

        let second = paginator.window(13, &PageQuery::number(2));
        assert_eq!((second.number, second.offset, second.limit), (2, 10, 10));
        assert_eq!(second.num_pages, 2);
    }

    #[test]
    fn out_of_range_requests() {
        let paginator = paginator(10);

        assert_eq!(paginator.window(13, &query("abc")).number, 1);
        assert_eq!(paginator.window(13, &query("")).number, 1);
        assert_eq!(paginator.window(13, &query("99")).number, 2);
        assert_eq!(paginator.window(13, &query("0")).number, 2);
        assert_eq!(paginator.window(13, &query("-3")).number, 2);
        assert_eq!(paginator.window(0, &query("5")).number, 1);
    }

    #[test]
    fn page_metadata() {
        let paginator = paginator(10);

        let first = paginator
            .window(13, &PageQuery::number(1))
            .into_page((0..10).collect());
        assert_eq!(first.len(), 10);
        assert!(first.has_next);
        assert!(!first.has_previous);
        assert_eq!(first.next_page_number, Some(2));
        assert_eq!(first.previous_page_number, None);
        assert_eq!(first.start_index, 1);

        let second = paginator
            .window(13, &PageQuery::number(2))
            .into_page((10..13).collect());
        assert_eq!(second.len(), 3);
        assert!(!second.has_next);
        assert!(second.has_previous);
        assert_eq!(second.previous_page_number, Some(1));
        assert_eq!(second.start_index, 11);

        let empty = paginator
            .window(0, &PageQuery::default())
            .into_page(Vec::<u8>::new());
        assert!(empty.is_empty());
        assert_eq!(empty.num_pages, 1);
        assert_eq!(empty.start_index, 0);
    }
}
