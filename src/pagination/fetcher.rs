//! Page fetchers
//!
//! A fetcher performs exactly one request per call and hands back a decoded
//! page. It never retries and never swallows errors; the cursor decides
//! what a `NotFound` means.

use super::types::{Page, PageOptions};
use crate::codec::{JsonPageCodec, PageCodec};
use crate::error::{Error, Result};
use crate::http::{ApiRequest, RequestExecutor};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Fetches one page of a collection
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Item type yielded by the collection
    type Item: Send;
    /// Options driving each request
    type Options: PageOptions;

    /// Fetch the page described by `options`
    async fn fetch_page(&self, options: &Self::Options) -> Result<Page<Self::Item>>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    type Item = F::Item;
    type Options = F::Options;

    async fn fetch_page(&self, options: &Self::Options) -> Result<Page<Self::Item>> {
        (**self).fetch_page(options).await
    }
}

// ============================================================================
// HTTP Fetcher
// ============================================================================

/// Fetches pages of `T` with a `GET` on a fixed collection path
pub struct HttpPageFetcher<T, O> {
    executor: Arc<dyn RequestExecutor>,
    path: String,
    codec: Arc<dyn PageCodec>,
    headers: HashMap<String, String>,
    _marker: PhantomData<fn() -> (T, O)>,
}

impl<T, O> HttpPageFetcher<T, O> {
    /// Create a fetcher decoding a bare JSON array
    pub fn new(executor: Arc<dyn RequestExecutor>, path: impl Into<String>) -> Self {
        Self {
            executor,
            path: path.into(),
            codec: Arc::new(JsonPageCodec::new()),
            headers: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Use a different codec
    #[must_use]
    pub fn with_codec(mut self, codec: impl PageCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Send a fixed header with every page request
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Collection path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T, O> Clone for HttpPageFetcher<T, O> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            path: self.path.clone(),
            codec: Arc::clone(&self.codec),
            headers: self.headers.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, O> fmt::Debug for HttpPageFetcher<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPageFetcher")
            .field("path", &self.path)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, O> PageFetcher for HttpPageFetcher<T, O>
where
    T: DeserializeOwned + Send,
    O: PageOptions + 'static,
{
    type Item = T;
    type Options = O;

    async fn fetch_page(&self, options: &O) -> Result<Page<T>> {
        options.validate()?;

        let request = ApiRequest::get(&self.path)
            .query_pairs(options.to_query())
            .headers(&self.headers);

        debug!(
            path = %self.path,
            marker = ?options.marker().map(|m| m.as_str()),
            "Fetching page"
        );

        let response = self.executor.execute(request).await?;
        let page = self.codec.decode_page(&response.body)?;

        page.try_map(|item| {
            serde_json::from_value(item)
                .map_err(|e| Error::malformed(format!("Failed to decode item: {e}")))
        })
    }
}
