//! Pagination types and traits
//!
//! Pages, markers, and the options values a cursor threads through
//! successive fetches.

use crate::error::{Error, Result};
use crate::types::QueryPairs;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Marker
// ============================================================================

/// Opaque continuation token; copied verbatim between pages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(String);

impl Marker {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Marker {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Marker {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Page
// ============================================================================

/// One page of a collection in server order
///
/// A page without a marker is the last page. A page with a marker may
/// still be empty; that does not end iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Continuation marker for the next page
    pub marker: Option<Marker>,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, marker: Option<Marker>) -> Self {
        Self { items, marker }
    }

    /// Create a final page
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Create an empty final page
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }

    /// Whether this page ends the collection
    pub fn is_last(&self) -> bool {
        self.marker.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Split into items and marker
    pub fn into_parts(self) -> (Vec<T>, Option<Marker>) {
        (self.items, self.marker)
    }

    /// Convert items, keeping the marker
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            marker: self.marker,
        }
    }

    /// Convert items fallibly, keeping the marker
    pub fn try_map<U>(self, f: impl FnMut(T) -> Result<U>) -> Result<Page<U>> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<Vec<_>>>()?,
            marker: self.marker,
        })
    }

    /// Keep only matching items, keeping the marker
    #[must_use]
    pub fn retain(mut self, f: impl FnMut(&T) -> bool) -> Self {
        self.items.retain(f);
        self
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

// ============================================================================
// Page Options
// ============================================================================

/// Request options that can be advanced from page to page
///
/// The cursor never mutates options in place: it derives the next
/// request's options with [`PageOptions::with_marker`].
pub trait PageOptions: Clone + Send + Sync {
    /// Marker this request resumes from
    fn marker(&self) -> Option<&Marker>;

    /// Copy of these options with `marker` substituted
    #[must_use]
    fn with_marker(&self, marker: Marker) -> Self;

    /// Query parameters for the request
    fn to_query(&self) -> QueryPairs;

    /// Reject options the provider would refuse
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Attribute to sort a listing by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    Id,
    Name,
    Status,
    CreatedAt,
    UpdatedAt,
    /// A key this client does not know; sent verbatim
    Unknown(String),
}

impl SortKey {
    pub fn as_str(&self) -> &str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Status => "status",
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
            SortKey::Unknown(raw) => raw,
        }
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "id" => SortKey::Id,
            "name" => SortKey::Name,
            "status" => SortKey::Status,
            "created_at" => SortKey::CreatedAt,
            "updated_at" => SortKey::UpdatedAt,
            _ => SortKey::Unknown(s.to_string()),
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction of a listing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
    /// A direction this client does not know
    Unknown(String),
}

impl SortDirection {
    pub fn as_str(&self) -> &str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
            SortDirection::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SortDirection::Unknown(_))
    }
}

impl FromStr for SortDirection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => SortDirection::Ascending,
            "desc" | "descending" => SortDirection::Descending,
            _ => SortDirection::Unknown(s.to_string()),
        })
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// List Options
// ============================================================================

/// Resource-agnostic listing options
///
/// Filters are equality filters passed through as query parameters; a
/// key may appear more than once (e.g. several `status` values).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Page size; provider default when absent
    pub limit: Option<u32>,
    /// Marker to resume after
    pub marker: Option<Marker>,
    /// Attribute to sort by
    pub sort_key: Option<SortKey>,
    /// Sort direction
    pub sort_dir: Option<SortDirection>,
    /// Equality filters
    pub filters: QueryPairs,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a marker
    #[must_use]
    pub fn marker(mut self, marker: impl Into<Marker>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Sort by a key
    #[must_use]
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.sort_key = Some(key);
        self
    }

    /// Sort direction
    #[must_use]
    pub fn sort_dir(mut self, direction: SortDirection) -> Self {
        self.sort_dir = Some(direction);
        self
    }

    /// Add an equality filter
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    /// Filter by status
    #[must_use]
    pub fn status(self, status: impl Into<String>) -> Self {
        self.filter("status", status)
    }

    /// Filter by name
    #[must_use]
    pub fn name(self, name: impl Into<String>) -> Self {
        self.filter("name", name)
    }
}

impl PageOptions for ListOptions {
    fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    fn with_marker(&self, marker: Marker) -> Self {
        Self {
            marker: Some(marker),
            ..self.clone()
        }
    }

    fn to_query(&self) -> QueryPairs {
        let mut query = QueryPairs::new();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(marker) = &self.marker {
            query.push(("marker".to_string(), marker.to_string()));
        }
        if let Some(key) = &self.sort_key {
            query.push(("sort_key".to_string(), key.to_string()));
        }
        if let Some(direction) = &self.sort_dir {
            query.push(("sort_dir".to_string(), direction.to_string()));
        }
        query.extend(self.filters.iter().cloned());
        query
    }

    fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(Error::invalid_argument("limit must be positive"));
        }
        if let Some(direction) = &self.sort_dir {
            if !direction.is_known() {
                return Err(Error::invalid_argument(format!(
                    "sort direction must be asc or desc, got '{direction}'"
                )));
            }
        }
        Ok(())
    }
}
