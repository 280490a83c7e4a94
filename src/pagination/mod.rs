//! Pagination module
//!
//! Marker-based cursor iteration over provider collections.
//!
//! # Overview
//!
//! Every listing endpoint accepts a `marker` (the last item seen) and a
//! `limit`, and answers with a page of items plus an optional marker for
//! the next page. Three pieces cooperate:
//! - [`PageOptions`] values describe one request and derive the next one
//! - a [`PageFetcher`] performs one request and decodes one page
//! - a [`Cursor`] threads markers between pages until none is returned

mod cursor;
mod fetcher;
mod types;

pub use cursor::Cursor;
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use types::{ListOptions, Marker, Page, PageOptions, SortDirection, SortKey};

#[cfg(test)]
mod tests;
