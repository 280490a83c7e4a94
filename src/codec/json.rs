//! JSON page codec
//!
//! Extracts the item array and continuation marker from a JSON listing
//! response. Field names are configuration; the codec knows nothing about
//! the resources themselves.

use super::href;
use super::types::{MarkerSource, PageCodec};
use crate::error::{Error, Result};
use crate::pagination::{Marker, Page};
use crate::types::OptionStringExt;
use serde_json::Value;

/// JSON codec with configurable items path and marker source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPageCodec {
    /// Dot path to the items array (`None` = the body is the array)
    items_path: Option<String>,
    /// Where to find the continuation marker
    marker: MarkerSource,
}

impl JsonPageCodec {
    /// Body is a bare array, no marker
    pub fn new() -> Self {
        Self::default()
    }

    /// Items under `path`, no marker
    pub fn with_items(path: impl Into<String>) -> Self {
        Self {
            items_path: Some(path.into()),
            marker: MarkerSource::None,
        }
    }

    /// OpenStack collection layout: `{"<name>": [...], "<name>_links": [{"rel": "next", ...}]}`
    pub fn openstack(collection: &str) -> Self {
        Self {
            items_path: Some(collection.to_string()),
            marker: MarkerSource::next_link(format!("{collection}_links")),
        }
    }

    /// Set the marker source
    #[must_use]
    pub fn with_marker(mut self, marker: MarkerSource) -> Self {
        self.marker = marker;
        self
    }

    /// Get the marker source
    pub fn marker_source(&self) -> &MarkerSource {
        &self.marker
    }

    fn extract_items(&self, value: &Value) -> Result<Vec<Value>> {
        let target = match &self.items_path {
            Some(path) => match lookup_path(value, path) {
                Some(v) => v,
                None => return Ok(vec![]),
            },
            None => value,
        };

        match target {
            Value::Array(items) => Ok(items.clone()),
            Value::Null => Ok(vec![]),
            other => Err(Error::malformed(format!(
                "Expected an array at '{}', found {}",
                self.items_path.as_deref().unwrap_or("$"),
                json_type(other)
            ))),
        }
    }

    fn extract_marker(&self, value: &Value) -> Result<Option<Marker>> {
        let marker = match &self.marker {
            MarkerSource::None => None,
            MarkerSource::Field { path } => match lookup_path(value, path) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                Some(other) => {
                    return Err(Error::malformed(format!(
                        "Marker at '{path}' must be a string, found {}",
                        json_type(other)
                    )))
                }
            },
            MarkerSource::Links { path, rel, param } => match lookup_path(value, path) {
                Some(Value::Array(links)) => match find_link(links, rel) {
                    Some(link) => href::query_param(link, param)?,
                    None => None,
                },
                None | Some(Value::Null) => None,
                Some(other) => {
                    return Err(Error::malformed(format!(
                        "Links at '{path}' must be an array, found {}",
                        json_type(other)
                    )))
                }
            },
        };

        Ok(marker.none_if_empty().map(Marker::new))
    }
}

impl PageCodec for JsonPageCodec {
    fn decode_page(&self, body: &str) -> Result<Page<Value>> {
        if body.trim().is_empty() {
            return Ok(Page::empty());
        }

        let value: Value = serde_json::from_str(body)
            .map_err(|e| Error::malformed(format!("Failed to parse page body: {e}")))?;

        let items = self.extract_items(&value)?;
        let marker = self.extract_marker(&value)?;
        Ok(Page::new(items, marker))
    }
}

/// Resolve a dot path (optionally prefixed with `$.`) into a JSON value
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    Some(current)
}

fn find_link<'a>(links: &'a [Value], rel: &str) -> Option<&'a str> {
    links
        .iter()
        .find(|link| link.get("rel").and_then(Value::as_str) == Some(rel))
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
