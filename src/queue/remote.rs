//! Queue service over the Marconi v1 REST API
//!
//! Every request carries a `Client-ID` header. The provider uses it to
//! decide which messages a stream with `echo=false` hides.

use super::service::QueueService;
use super::types::{
    Claim, ClaimId, ClaimRequest, Message, MessageId, MessagesCreated, NewMessage, StreamOptions,
};
use crate::codec::{href, JsonPageCodec, MarkerSource, PageCodec};
use crate::error::{Error, Result};
use crate::fallback::NotFoundExt;
use crate::http::{ApiRequest, ApiResponse, HttpClient, HttpClientConfig, RequestExecutor};
use crate::pagination::{Cursor, HttpPageFetcher, ListOptions, Page, PageOptions};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Header identifying the consumer to the provider
pub const CLIENT_ID_HEADER: &str = "Client-ID";

const API_PREFIX: &str = "/v1/queues";

/// Longest queue name a provider accepts
pub const MAX_QUEUE_NAME_LEN: usize = 64;

/// Check a queue name: 1 to 64 ASCII letters, digits, `_` or `-`
pub fn validate_queue_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_QUEUE_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!("Invalid queue name '{name}'")))
    }
}

// ============================================================================
// Wire Shapes
// ============================================================================

#[derive(Deserialize)]
struct CreatedWire {
    #[serde(default)]
    resources: Vec<String>,
}

#[derive(Deserialize)]
struct ClaimWire {
    #[serde(default)]
    href: Option<String>,
    ttl: u64,
    #[serde(default)]
    age: u64,
    #[serde(default)]
    messages: Vec<Message>,
}

/// A queue as listed by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    #[serde(default)]
    pub href: Option<String>,
}

// ============================================================================
// Remote Queue
// ============================================================================

/// One queue on a remote provider
#[derive(Clone)]
pub struct RemoteQueue {
    executor: Arc<dyn RequestExecutor>,
    name: String,
    client_id: Uuid,
    codec: JsonPageCodec,
}

impl RemoteQueue {
    /// Handle for queue `name`, acting as `client_id`
    pub fn new(executor: Arc<dyn RequestExecutor>, name: impl Into<String>, client_id: Uuid) -> Result<Self> {
        let name = name.into();
        validate_queue_name(&name)?;
        Ok(Self {
            executor,
            name,
            client_id,
            codec: JsonPageCodec::with_items("messages").with_marker(MarkerSource::next_link("links")),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same queue under a different client identity
    #[must_use]
    pub fn as_client(&self, client_id: Uuid) -> Self {
        Self {
            client_id,
            ..self.clone()
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("{API_PREFIX}/{}/{suffix}", self.name)
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request = request.header(CLIENT_ID_HEADER, self.client_id.to_string());
        self.executor.execute(request).await
    }

    /// Work out why the provider refused a delete under `claim_id`
    async fn explain_forbidden_delete(
        &self,
        id: &MessageId,
        claim_id: &ClaimId,
        refusal: Error,
    ) -> Result<()> {
        match self.get(id).await? {
            None => Ok(()),
            Some(message) => match message.claim_id {
                None => Err(Error::not_claimed(id.as_str())),
                Some(holder) if &holder != claim_id => Err(Error::claim_mismatch(
                    id.as_str(),
                    claim_id.as_str(),
                    Some(holder.to_string()),
                )),
                Some(_) => Err(refusal),
            },
        }
    }
}

impl std::fmt::Debug for RemoteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteQueue")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a MessageId>) -> String {
    ids.into_iter()
        .map(MessageId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl QueueService for RemoteQueue {
    fn client_id(&self) -> Uuid {
        self.client_id
    }

    async fn post(&self, messages: Vec<NewMessage>) -> Result<MessagesCreated> {
        if messages.is_empty() {
            return Ok(MessagesCreated::default());
        }
        for message in &messages {
            message.validate()?;
        }

        let count = messages.len();
        let body = serde_json::to_value(&messages)?;
        let response = self
            .send(ApiRequest::post(self.path("messages")).json(body))
            .await?;
        let created: CreatedWire = response.json()?;
        let created = MessagesCreated::from_resources(&created.resources)?;

        if created.ids.len() != count {
            warn!(
                queue = %self.name,
                posted = count,
                created = created.ids.len(),
                "Provider accepted only part of the batch"
            );
        }
        Ok(created)
    }

    async fn stream_page(&self, options: &StreamOptions) -> Result<Page<Message>> {
        options.validate()?;

        let request = ApiRequest::get(self.path("messages")).query_pairs(options.to_query());
        let response = self.send(request).await?;
        if response.is_empty() {
            return Ok(Page::empty());
        }

        self.codec
            .decode_page(&response.body)?
            .try_map(|item| Ok(serde_json::from_value::<Message>(item)?))
    }

    async fn get(&self, id: &MessageId) -> Result<Option<Message>> {
        let request = ApiRequest::get(self.path(&format!("messages/{id}")));
        self.send(request)
            .await
            .and_then(|response| response.json::<Message>())
            .none_on_not_found()
    }

    async fn list(&self, ids: &[MessageId]) -> Result<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = ApiRequest::get(self.path("messages")).query("ids", join_ids(ids));
        let Some(response) = self.send(request).await.none_on_not_found()? else {
            return Ok(Vec::new());
        };
        if response.is_empty() {
            return Ok(Vec::new());
        }
        response.json()
    }

    async fn delete(&self, id: &MessageId) -> Result<()> {
        let request = ApiRequest::delete(self.path(&format!("messages/{id}")));
        self.send(request).await.none_on_not_found().map(|_| ())
    }

    async fn delete_many(&self, ids: &[MessageId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = ApiRequest::delete(self.path("messages")).query("ids", join_ids(ids));
        self.send(request).await.none_on_not_found().map(|_| ())
    }

    async fn delete_by_claim(&self, id: &MessageId, claim_id: &ClaimId) -> Result<()> {
        let request = ApiRequest::delete(self.path(&format!("messages/{id}")))
            .query("claim_id", claim_id.as_str());

        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e @ Error::Forbidden { .. }) => {
                debug!(message = %id, claim = %claim_id, "Delete refused, checking holder");
                self.explain_forbidden_delete(id, claim_id, e).await
            }
            Err(e) => Err(e),
        }
    }

    async fn claim(&self, request: ClaimRequest) -> Result<Vec<Message>> {
        request.validate()?;

        let api_request = ApiRequest::post(self.path("claims"))
            .query("limit", request.limit.to_string())
            .json(serde_json::to_value(request)?);
        let response = self.send(api_request).await?;
        if response.is_empty() {
            debug!(queue = %self.name, "No messages available to claim");
            return Ok(Vec::new());
        }

        let location_claim = response
            .header("location")
            .map(href::last_segment)
            .transpose()?
            .map(ClaimId::new);

        let mut messages: Vec<Message> = response.json()?;
        for message in &mut messages {
            if message.claim_id.is_none() {
                message.claim_id = location_claim.clone();
            }
        }

        debug!(
            queue = %self.name,
            claim = ?location_claim.as_ref().map(ClaimId::as_str),
            count = messages.len(),
            "Claimed messages"
        );
        Ok(messages)
    }

    async fn get_claim(&self, id: &ClaimId) -> Result<Option<Claim>> {
        let request = ApiRequest::get(self.path(&format!("claims/{id}")));
        let Some(response) = self.send(request).await.none_on_not_found()? else {
            return Ok(None);
        };

        let wire: ClaimWire = response.json()?;
        let claim_id = match &wire.href {
            Some(location) => ClaimId::new(href::last_segment(location)?),
            None => id.clone(),
        };
        Ok(Some(Claim {
            id: claim_id,
            ttl: Duration::from_secs(wire.ttl),
            grace: None,
            age: Duration::from_secs(wire.age),
            messages: wire.messages,
        }))
    }

    async fn renew(&self, id: &ClaimId, ttl: Duration, grace: Duration) -> Result<bool> {
        let renewal = ClaimRequest::new(ttl, grace);
        renewal.validate()?;

        let request = ApiRequest::patch(self.path(&format!("claims/{id}")))
            .json(serde_json::to_value(renewal)?);
        self.send(request).await.false_on_not_found()
    }

    async fn release(&self, id: &ClaimId) -> Result<()> {
        let request = ApiRequest::delete(self.path(&format!("claims/{id}")));
        self.send(request).await.none_on_not_found().map(|_| ())
    }
}

// ============================================================================
// Queue Client
// ============================================================================

/// Queue administration on a remote provider
#[derive(Clone)]
pub struct QueueClient {
    executor: Arc<dyn RequestExecutor>,
    client_id: Uuid,
}

impl QueueClient {
    /// Client acting under a fresh random identity
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self::with_client_id(executor, Uuid::new_v4())
    }

    pub fn with_client_id(executor: Arc<dyn RequestExecutor>, client_id: Uuid) -> Self {
        Self {
            executor,
            client_id,
        }
    }

    /// Build an HTTP-backed client
    pub fn from_config(config: HttpClientConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpClient::with_config(config)?)))
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Handle for one queue
    pub fn queue(&self, name: &str) -> Result<RemoteQueue> {
        RemoteQueue::new(Arc::clone(&self.executor), name, self.client_id)
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let request = request.header(CLIENT_ID_HEADER, self.client_id.to_string());
        self.executor.execute(request).await
    }

    /// Create a queue; `false` when it already existed
    pub async fn create_queue(&self, name: &str) -> Result<bool> {
        validate_queue_name(name)?;
        let response = self
            .send(ApiRequest::put(format!("{API_PREFIX}/{name}")))
            .await?;
        debug!(queue = name, status = response.status, "Created queue");
        Ok(response.status == 201)
    }

    /// Delete a queue and its messages; deleting twice is fine
    pub async fn delete_queue(&self, name: &str) -> Result<()> {
        validate_queue_name(name)?;
        self.send(ApiRequest::delete(format!("{API_PREFIX}/{name}")))
            .await
            .none_on_not_found()
            .map(|_| ())
    }

    /// Whether a queue exists
    pub async fn queue_exists(&self, name: &str) -> Result<bool> {
        validate_queue_name(name)?;
        self.send(ApiRequest::new(crate::types::Method::HEAD, format!("{API_PREFIX}/{name}")))
            .await
            .false_on_not_found()
    }

    /// Walk the queues visible to this client
    pub fn list_queues(&self, options: ListOptions) -> Cursor<HttpPageFetcher<QueueInfo, ListOptions>> {
        let fetcher = HttpPageFetcher::new(Arc::clone(&self.executor), API_PREFIX)
            .with_codec(JsonPageCodec::with_items("queues").with_marker(MarkerSource::next_link("links")))
            .with_header(CLIENT_ID_HEADER, self.client_id.to_string());
        Cursor::new(fetcher, options)
    }
}

impl std::fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueClient")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
