//! Codec types and traits
//!
//! Defines how a raw response body becomes a [`Page`] of JSON values.

use crate::error::Result;
use crate::pagination::Page;
use serde_json::Value;

/// Where a response carries its continuation marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MarkerSource {
    /// Single-page endpoint; never a marker
    #[default]
    None,

    /// A scalar field holding the marker (e.g. `"next_marker": "abc"`)
    Field {
        /// Dot path to the field
        path: String,
    },

    /// A links array whose entry with a matching `rel` has an `href` carrying
    /// the marker as a query parameter (e.g. `[{"rel": "next", "href": "...?marker=42"}]`)
    Links {
        /// Dot path to the links array
        path: String,
        /// Relation to follow
        rel: String,
        /// Query parameter holding the marker
        param: String,
    },
}

impl MarkerSource {
    /// Marker read from a scalar field
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field { path: path.into() }
    }

    /// Marker read from the `next` link of a links array
    pub fn next_link(path: impl Into<String>) -> Self {
        Self::Links {
            path: path.into(),
            rel: "next".to_string(),
            param: "marker".to_string(),
        }
    }
}

/// Trait for decoding response bodies into pages
///
/// A codec only has to report items and marker faithfully; it never
/// decides whether iteration continues.
pub trait PageCodec: Send + Sync {
    /// Decode one response body. An empty body is an empty, final page.
    fn decode_page(&self, body: &str) -> Result<Page<Value>>;
}
