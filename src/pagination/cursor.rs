//! Cursor iteration over marker-paginated collections
//!
//! The cursor threads the marker from each page into the next request and
//! stops when a page arrives without one. A page can be empty and still
//! carry a marker; that costs one more request, not a stop. A page that
//! hands back the marker it was requested with ends the walk.

use super::fetcher::PageFetcher;
use super::types::{Marker, Page, PageOptions};
use crate::error::Result;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

/// Where a cursor is in its walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    /// Ended without error; there is nothing to resume
    Exhausted,
    /// Ended on an error; the marker is kept for resuming
    Failed,
}

/// Lazily walks a collection one page at a time
///
/// # Example
///
/// ```ignore
/// let mut cursor = Cursor::new(fetcher, ListOptions::new().limit(50));
/// while let Some(page) = cursor.next_page().await? {
///     for stack in page {
///         println!("{stack:?}");
///     }
/// }
/// ```
pub struct Cursor<F: PageFetcher> {
    fetcher: F,
    options: F::Options,
    state: State,
    pages_fetched: usize,
}

impl<F: PageFetcher> Cursor<F> {
    /// Start at the position described by `options`
    pub fn new(fetcher: F, options: F::Options) -> Self {
        Self {
            fetcher,
            options,
            state: State::Active,
            pages_fetched: 0,
        }
    }

    /// Continue from a previously captured marker
    pub fn resume(fetcher: F, options: F::Options, marker: Marker) -> Self {
        let options = options.with_marker(marker);
        Self::new(fetcher, options)
    }

    /// Marker the next fetch would send
    ///
    /// After an error this is the position to resume from. Once the
    /// collection is exhausted there is no next marker.
    pub fn marker(&self) -> Option<&Marker> {
        match self.state {
            State::Exhausted => None,
            State::Active | State::Failed => self.options.marker(),
        }
    }

    /// Options for the next fetch
    pub fn options(&self) -> &F::Options {
        &self.options
    }

    /// Number of fetches performed so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether iteration has ended
    pub fn is_done(&self) -> bool {
        self.state != State::Active
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch the next page
    ///
    /// Returns `Ok(None)` once the collection is exhausted. A 404 on the
    /// first fetch means the collection is missing and reads as a single
    /// empty page; on a later fetch it is an error like any other. Errors
    /// are returned once and end iteration.
    pub async fn next_page(&mut self) -> Result<Option<Page<F::Item>>> {
        if self.is_done() {
            return Ok(None);
        }

        self.pages_fetched += 1;
        let page = match self.fetcher.fetch_page(&self.options).await {
            Ok(page) => page,
            Err(e) if e.is_not_found() && self.pages_fetched == 1 => {
                debug!(error = %e, "Collection not found, treating as empty");
                self.state = State::Exhausted;
                return Ok(Some(Page::empty()));
            }
            Err(e) => {
                self.state = State::Failed;
                return Err(e);
            }
        };

        debug!(
            page = self.pages_fetched,
            items = page.len(),
            has_more = !page.is_last(),
            "Fetched page"
        );

        match &page.marker {
            None => self.state = State::Exhausted,
            Some(next) if self.options.marker() == Some(next) => {
                warn!(
                    marker = %next,
                    items = page.len(),
                    "Page repeated the request marker, stopping"
                );
                self.state = State::Exhausted;
            }
            Some(next) => self.options = self.options.with_marker(next.clone()),
        }

        Ok(Some(page))
    }

    /// Fetch every remaining page and concatenate the items
    pub async fn collect_all(&mut self) -> Result<Vec<F::Item>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page.items);
        }
        Ok(items)
    }

    /// Stream of pages
    ///
    /// An error is yielded in place of the page that failed and ends the
    /// stream.
    pub fn into_pages(self) -> impl Stream<Item = Result<Page<F::Item>>> + Send {
        stream::unfold(self, |mut cursor| async move {
            match cursor.next_page().await {
                Ok(Some(page)) => Some((Ok(page), cursor)),
                Ok(None) => None,
                Err(e) => Some((Err(e), cursor)),
            }
        })
    }

    /// Stream of items in page order
    pub fn into_items(self) -> impl Stream<Item = Result<F::Item>> + Send {
        self.into_pages().flat_map(|page| match page {
            Ok(page) => stream::iter(page.items.into_iter().map(Ok)).left_stream(),
            Err(e) => stream::once(futures::future::ready(Err(e))).right_stream(),
        })
    }
}

impl<F> std::fmt::Debug for Cursor<F>
where
    F: PageFetcher,
    F::Options: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("pages_fetched", &self.pages_fetched)
            .finish_non_exhaustive()
    }
}
