// Paginated collection traversal.
// Follows "next page" cursors until the source stops reporting one.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use thiserror::Error;
use tracing::{debug, warn};

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in source order.
    pub items: Vec<T>,
    /// Where the next page begins, if there is one.
    pub next: Option<String>,
    /// HTTP status the page was served with.
    pub status: u16,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>, status: u16) -> Self {
        Self {
            items,
            next,
            status,
        }
    }

    /// A successful page.
    pub fn ok(items: Vec<T>, next: Option<String>) -> Self {
        Self::new(items, next, 200)
    }

    /// A page that reported failure. It carries no items and no cursor.
    pub fn failed(status: u16) -> Self {
        Self::new(Vec::new(), None, status)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A page in a traversal reported a non-success status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Request failure (code: {status})")]
pub struct FetchError {
    pub status: u16,
}

/// Iterator over the pages of a listing, as fetched.
///
/// Stops after a page without a cursor, after a failed page, or after
/// `fetch` returns an error.
pub struct Pages<F, T, E> {
    fetch: F,
    next: Option<String>,
    _item: PhantomData<fn() -> (T, E)>,
}

impl<F, T, E> Iterator for Pages<F, T, E>
where
    F: FnMut(&str) -> Result<Page<T>, E>,
{
    type Item = Result<Page<T>, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let url = self.next.take()?;
        debug!(url = %url, "fetching page");

        let page = (self.fetch)(&url);
        if let Ok(page) = &page {
            if page.is_success() {
                self.next = page.next.clone();
            } else {
                warn!(url = %url, status = page.status, "page request failed");
            }
        }
        Some(page)
    }
}

impl<F, T, E> FusedIterator for Pages<F, T, E> where F: FnMut(&str) -> Result<Page<T>, E> {}

/// Lazy iterator over the items of every page.
///
/// A failed page surfaces as a single `Err` when the traversal reaches it,
/// after which the iterator is exhausted.
pub struct Traverse<F, T, E> {
    pages: Pages<F, T, E>,
    current: std::vec::IntoIter<T>,
    done: bool,
}

impl<F, T, E> Iterator for Traverse<F, T, E>
where
    F: FnMut(&str) -> Result<Page<T>, E>,
    E: From<FetchError>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }

            match self.pages.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                Some(Ok(page)) if !page.is_success() => {
                    self.done = true;
                    return Some(Err(FetchError {
                        status: page.status,
                    }
                    .into()));
                }
                Some(Ok(page)) => self.current = page.items.into_iter(),
            }
        }
    }
}

impl<F, T, E> FusedIterator for Traverse<F, T, E>
where
    F: FnMut(&str) -> Result<Page<T>, E>,
    E: From<FetchError>,
{
}

/// Iterate over the raw pages reachable from `start`.
pub fn pages<F, T, E>(fetch: F, start: impl Into<String>) -> Pages<F, T, E>
where
    F: FnMut(&str) -> Result<Page<T>, E>,
{
    Pages {
        fetch,
        next: Some(start.into()),
        _item: PhantomData,
    }
}

/// Iterate lazily over the items of every page reachable from `start`.
///
/// Nothing is fetched until the first item is requested.
pub fn traverse<F, T, E>(fetch: F, start: impl Into<String>) -> Traverse<F, T, E>
where
    F: FnMut(&str) -> Result<Page<T>, E>,
    E: From<FetchError>,
{
    Traverse {
        pages: pages(fetch, start),
        current: Vec::new().into_iter(),
        done: false,
    }
}

/// Fetch every page reachable from `start` and merge their items.
///
/// All or nothing: the first failed page aborts the traversal and the items
/// gathered so far are discarded.
pub fn traverse_collect<F, T, E>(fetch: F, start: impl Into<String>) -> Result<Vec<T>, E>
where
    F: FnMut(&str) -> Result<Page<T>, E>,
    E: From<FetchError>,
{
    traverse(fetch, start).collect()
}
