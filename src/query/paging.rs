//! Sort-then-page stage shared by every list endpoint.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A comparable value extracted from a record for sorting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue<'a> {
    /// Text, compared byte-wise.
    Text(&'a str),
    /// Number, compared with [`f64::total_cmp`].
    Number(f64),
    /// Timestamp.
    Time(DateTime<Utc>),
}

impl SortValue<'_> {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Records that can be sorted by a named field.
pub trait Sortable {
    /// Value of `field`, or `None` when the record has no such field.
    fn sort_value(&self, field: &str) -> Option<SortValue<'_>>;
}

/// Stable sort of `items` by `field`.
///
/// An empty or unknown field leaves the input order untouched.
pub fn sort_items<T: Sortable>(items: &mut [T], field: &str, descending: bool) {
    if field.is_empty() {
        return;
    }
    let Some(first) = items.first() else {
        return;
    };
    if first.sort_value(field).is_none() {
        tracing::debug!(field, "ignoring unknown sort field");
        return;
    }
    items.sort_by(|a, b| {
        let ord = match (a.sort_value(field), b.sort_value(field)) {
            (Some(x), Some(y)) => x.compare(&y),
            _ => Ordering::Equal,
        };
        if descending { ord.reverse() } else { ord }
    });
}

/// Requested page. Negative numbers or a non-positive size mean "no paging".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page number, `-1` for all.
    pub page: i64,
    /// Page size, `-1` for all.
    pub size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::all()
    }
}

impl PageRequest {
    /// Returns every item as a single page.
    #[must_use]
    pub const fn all() -> Self {
        Self { page: -1, size: -1 }
    }

    /// Builds a request.
    #[must_use]
    pub const fn new(page: i64, size: i64) -> Self {
        Self { page, size }
    }

    /// `true` when both page and size select an actual page.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.page >= 0 && self.size > 0
    }
}

/// One page of results with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination<T> {
    /// Items of this page.
    pub content: Vec<T>,
    /// Items across all pages.
    pub total_elements: u64,
    /// Number of pages.
    pub total_pages: u64,
    /// Zero-based page number.
    pub page_number: u64,
    /// Page size.
    pub page_size: u64,
    /// `true` on the first page.
    pub first: bool,
    /// `true` on the last page.
    pub last: bool,
    /// `true` when this page holds no items.
    pub empty: bool,
}

impl<T> Pagination<T> {
    /// Converts the content, keeping the metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Pagination<U> {
        Pagination {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            page_number: self.page_number,
            page_size: self.page_size,
            first: self.first,
            last: self.last,
            empty: self.empty,
        }
    }
}

/// Cuts `items` into the requested page.
///
/// Without paging every item comes back as page 0 with
/// `page_size == total_elements`. Otherwise `total_pages` is
/// `ceil(total / size)`, so `total_pages * size >= total` and
/// `(total_pages - 1) * size < total` whenever there are items.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Pagination<T> {
    let total = items.len() as u64;

    let (Ok(page), Ok(size)) = (u64::try_from(request.page), u64::try_from(request.size)) else {
        return whole(items);
    };
    if size == 0 {
        return whole(items);
    }

    let total_pages = total.div_ceil(size);
    let start = usize::try_from(page.saturating_mul(size)).unwrap_or(usize::MAX);
    let take = usize::try_from(size).unwrap_or(usize::MAX);
    let content: Vec<T> = items.into_iter().skip(start).take(take).collect();
    let empty = content.is_empty();

    Pagination {
        content,
        total_elements: total,
        total_pages,
        page_number: page,
        page_size: size,
        first: page == 0,
        last: page.saturating_add(1) >= total_pages,
        empty,
    }
}

fn whole<T>(items: Vec<T>) -> Pagination<T> {
    let total = items.len() as u64;
    Pagination {
        content: items,
        total_elements: total,
        total_pages: u64::from(total > 0),
        page_number: 0,
        page_size: total,
        first: true,
        last: true,
        empty: total == 0,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        score: f64,
    }

    impl Sortable for Item {
        fn sort_value(&self, field: &str) -> Option<SortValue<'_>> {
            match field {
                "name" => Some(SortValue::Text(self.name)),
                "score" => Some(SortValue::Number(self.score)),
                _ => None,
            }
        }
    }

    fn items() -> Vec<Item> {
        vec![
            Item { name: "c", score: 1.0 },
            Item { name: "a", score: 2.0 },
            Item { name: "b", score: 1.0 },
        ]
    }

    fn names(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|i| i.name).collect()
    }

    #[test]
    fn sort_by_text_and_number() {
        let mut v = items();
        sort_items(&mut v, "name", false);
        assert_eq!(names(&v), vec!["a", "b", "c"]);
        sort_items(&mut v, "score", true);
        assert_eq!(names(&v), vec!["a", "b", "c"]);
    }

    #[test]
    fn sort_is_stable() {
        let mut v = items();
        sort_items(&mut v, "score", false);
        assert_eq!(names(&v), vec!["c", "b", "a"]);
    }

    #[test]
    fn unknown_or_empty_field_is_noop() {
        let mut v = items();
        sort_items(&mut v, "nope", true);
        assert_eq!(names(&v), vec!["c", "a", "b"]);
        sort_items(&mut v, "", true);
        assert_eq!(names(&v), vec!["c", "a", "b"]);
    }

    #[test]
    fn no_paging_returns_everything() {
        let page = paginate(items(), PageRequest::all());
        assert_eq!(page.content.len(), 3);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page_size, 3);
        assert!(page.first && page.last && !page.empty);

        let page = paginate(items(), PageRequest::new(0, 0));
        assert_eq!(page.content.len(), 3);

        let page = paginate(Vec::<Item>::new(), PageRequest::new(-1, 10));
        assert_eq!(page.total_pages, 0);
        assert!(page.empty);
    }

    #[test]
    fn pages_slice_and_flag() {
        let page = paginate(items(), PageRequest::new(0, 2));
        assert_eq!(names(&page.content), vec!["c", "a"]);
        assert!(page.first);
        assert!(!page.last);

        let page = paginate(items(), PageRequest::new(1, 2));
        assert_eq!(names(&page.content), vec!["b"]);
        assert!(!page.first);
        assert!(page.last);
        assert!(!page.empty);

        let page = paginate(items(), PageRequest::new(7, 2));
        assert!(page.content.is_empty());
        assert!(page.last);
        assert!(page.empty);
    }

    #[test]
    fn empty_result_is_an_empty_page() {
        let page = paginate(Vec::<Item>::new(), PageRequest::new(0, 10));
        assert!(page.content.is_empty());
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page_size, 10);
        assert!(page.first && page.last && page.empty);
    }

    #[test]
    fn paging_totals_bound_the_elements() {
        for total in 1..40_u64 {
            for size in 1..12_i64 {
                let data: Vec<u64> = (0..total).collect();
                let page = paginate(data, PageRequest::new(0, size));
                let size = page.page_size;
                assert!(page.total_pages * size >= total);
                assert!((page.total_pages - 1) * size < total);
            }
        }
    }

    #[test]
    fn map_keeps_metadata() {
        let page = paginate(items(), PageRequest::new(0, 2)).map(|i| i.name);
        assert_eq!(page.content, vec!["c", "a"]);
        assert_eq!(page.total_pages, 2);
    }
}
