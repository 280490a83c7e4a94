//! Helpers for resource hrefs
//!
//! Providers hand back relative hrefs such as
//! `/v1/queues/demo/messages/51db6f78?claim_id=a28ee94e`. Identity lives in
//! the last path segment and claim/marker tokens live in the query.

use crate::error::{Error, Result};
use url::Url;

const PLACEHOLDER_BASE: &str = "http://href.invalid/";

/// Parse an absolute or relative href
pub fn parse(href: &str) -> Result<Url> {
    let base = Url::parse(PLACEHOLDER_BASE)?;
    base.join(href)
        .map_err(|e| Error::malformed(format!("Invalid href '{href}': {e}")))
}

/// First value of a query parameter, if present and non-empty
pub fn query_param(href: &str, name: &str) -> Result<Option<String>> {
    let url = parse(href)?;
    Ok(url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty()))
}

/// Last non-empty path segment
pub fn last_segment(href: &str) -> Result<String> {
    let url = parse(href)?;
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(ToString::to_string)
        .ok_or_else(|| Error::malformed(format!("No resource id in href '{href}'")))
}
