//! Generic service client
//!
//! Resource-agnostic access to one provider endpoint: cursor listings,
//! single-item reads and deletes. Resource payloads stay opaque; callers
//! pick the item type and the envelope key.

use crate::codec::{lookup_path, JsonPageCodec};
use crate::error::{Error, Result};
use crate::fallback::NotFoundExt;
use crate::http::{ApiRequest, HttpClient, HttpClientConfig, RequestExecutor};
use crate::pagination::{Cursor, HttpPageFetcher, ListOptions};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Cursor over a `ServiceClient` listing
pub type ListCursor<T> = Cursor<HttpPageFetcher<T, ListOptions>>;

/// Client for one service endpoint
#[derive(Clone)]
pub struct ServiceClient {
    executor: Arc<dyn RequestExecutor>,
    headers: HashMap<String, String>,
}

impl ServiceClient {
    /// Wrap an existing executor
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self {
            executor,
            headers: HashMap::new(),
        }
    }

    /// Build an HTTP-backed client
    pub fn from_config(config: HttpClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpClient::with_config(config)?)))
    }

    /// Send a header with every request
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn executor(&self) -> &Arc<dyn RequestExecutor> {
        &self.executor
    }

    /// Page fetcher for a collection path
    pub fn fetcher<T>(&self, path: &str, codec: JsonPageCodec) -> HttpPageFetcher<T, ListOptions> {
        self.headers.iter().fold(
            HttpPageFetcher::new(Arc::clone(&self.executor), path).with_codec(codec),
            |fetcher, (key, value)| fetcher.with_header(key.clone(), value.clone()),
        )
    }

    /// List an OpenStack-style collection (`{"<name>": [...], "<name>_links": [...]}`)
    ///
    /// `collection` is both the last path segment and the envelope key,
    /// e.g. `"networks"` for `GET /v2.0/networks`.
    pub fn list<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        collection: &str,
        options: ListOptions,
    ) -> ListCursor<T> {
        Cursor::new(
            self.fetcher(path, JsonPageCodec::openstack(collection)),
            options,
        )
    }

    /// List with an explicit codec
    pub fn list_with<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        codec: JsonPageCodec,
        options: ListOptions,
    ) -> ListCursor<T> {
        Cursor::new(self.fetcher(path, codec), options)
    }

    /// Read one resource; `None` when it does not exist
    ///
    /// `envelope` names the wrapper key (`{"stack": {...}}`), if any.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, envelope: Option<&str>) -> Result<Option<T>> {
        self.get_selected(path, envelope, &[]).await
    }

    /// Read one resource, asking the provider for a subset of its fields
    pub async fn get_selected<T: DeserializeOwned>(
        &self,
        path: &str,
        envelope: Option<&str>,
        fields: &[&str],
    ) -> Result<Option<T>> {
        let request = ApiRequest::get(path)
            .query_pairs(fields.iter().map(|f| ("fields".to_string(), (*f).to_string())))
            .headers(&self.headers);

        debug!(path, fields = fields.len(), "Reading resource");

        let Some(response) = self.executor.execute(request).await.none_on_not_found()? else {
            return Ok(None);
        };

        let value: serde_json::Value = response.json()?;
        let body = match envelope {
            Some(key) => lookup_path(&value, key)
                .cloned()
                .ok_or_else(|| Error::malformed(format!("Missing '{key}' in response from {path}")))?,
            None => value,
        };

        Ok(Some(serde_json::from_value(body)?))
    }

    /// Delete one resource; `false` when it was already gone
    pub async fn delete(&self, path: &str) -> Result<bool> {
        let request = ApiRequest::delete(path).headers(&self.headers);
        debug!(path, "Deleting resource");
        self.executor.execute(request).await.false_on_not_found()
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
