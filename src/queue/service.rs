//! Queue service contract
//!
//! Per message the protocol is a small state machine:
//!
//! ```text
//!  post ──► Unclaimed ──claim──► Claimed ──delete_by_claim──► Deleted
//!               ▲                   │
//!               └──release / hold expires
//! ```
//!
//! A message is covered by at most one live claim. Deleting a claimed
//! message through [`QueueService::delete_by_claim`] requires the claim id
//! that holds it.

use super::types::{Claim, ClaimId, ClaimRequest, Message, MessageId, MessagesCreated, NewMessage, StreamOptions};
use crate::error::Result;
use crate::pagination::{Cursor, Page, PageFetcher};
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Operations of a message queue with claims
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Identity this handle posts and reads as
    fn client_id(&self) -> Uuid;

    /// Post messages; ids come back in posting order
    async fn post(&self, messages: Vec<NewMessage>) -> Result<MessagesCreated>;

    /// Read one page of the queue
    async fn stream_page(&self, options: &StreamOptions) -> Result<Page<Message>>;

    /// Read one message; `None` when it does not exist
    async fn get(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Read several messages; missing ids are skipped
    async fn list(&self, ids: &[MessageId]) -> Result<Vec<Message>>;

    /// Delete a message regardless of claims; deleting twice is fine
    async fn delete(&self, id: &MessageId) -> Result<()>;

    /// Delete several messages regardless of claims
    async fn delete_many(&self, ids: &[MessageId]) -> Result<()>;

    /// Delete a message held by `claim_id`
    ///
    /// Fails with `ClaimMismatch` when another claim holds the message and
    /// with `NotClaimed` when none does; the message is left untouched in
    /// both cases. A message that is already gone counts as deleted.
    async fn delete_by_claim(&self, id: &MessageId, claim_id: &ClaimId) -> Result<()>;

    /// Claim up to `request.limit` eligible messages under one new claim
    ///
    /// An empty result means no messages were available.
    async fn claim(&self, request: ClaimRequest) -> Result<Vec<Message>>;

    /// Look up a claim; `None` once it has expired or been released
    async fn get_claim(&self, id: &ClaimId) -> Result<Option<Claim>>;

    /// Restart a claim's lifetime; `false` when the claim no longer exists
    async fn renew(&self, id: &ClaimId, ttl: Duration, grace: Duration) -> Result<bool>;

    /// Return a claim's messages to the queue; releasing twice is fine
    async fn release(&self, id: &ClaimId) -> Result<()>;

    /// Walk the whole queue page by page
    fn stream(&self, options: StreamOptions) -> MessageStream<Self>
    where
        Self: Clone + Sized,
    {
        Cursor::new(MessagePages::new(self.clone()), options)
    }
}

/// Cursor over the messages of a queue
pub type MessageStream<Q> = Cursor<MessagePages<Q>>;

/// Adapts a queue to the page fetcher contract
#[derive(Debug, Clone)]
pub struct MessagePages<Q> {
    queue: Q,
}

impl<Q> MessagePages<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }
}

#[async_trait]
impl<Q: QueueService> PageFetcher for MessagePages<Q> {
    type Item = Message;
    type Options = StreamOptions;

    async fn fetch_page(&self, options: &StreamOptions) -> Result<Page<Message>> {
        self.queue.stream_page(options).await
    }
}
