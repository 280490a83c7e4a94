//! In-process queue
//!
//! A complete implementation of the claim protocol held in memory. Handles
//! are cheap to clone and share one queue; [`MemoryQueue::as_client`]
//! gives a handle that acts as a different consumer.
//!
//! Time comes from `tokio::time`, so tests can drive TTL expiry with a
//! paused clock.

use super::service::QueueService;
use super::types::{
    Claim, ClaimId, ClaimRequest, Message, MessageId, MessagesCreated, NewMessage, StreamOptions,
};
use crate::error::{Error, Result};
use crate::pagination::{Marker, Page, PageOptions};
use crate::types::JsonValue;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// State
// ============================================================================

#[derive(Debug)]
struct StoredMessage {
    id: MessageId,
    body: JsonValue,
    author: Uuid,
    ttl: Duration,
    created: Instant,
    expires: Instant,
    claim: Option<ClaimId>,
}

#[derive(Debug)]
struct StoredClaim {
    ttl: Duration,
    grace: Duration,
    created: Instant,
    messages: Vec<MessageId>,
}

impl StoredClaim {
    /// Instant after which the claim's messages are eligible again
    fn hold_until(&self) -> Instant {
        self.created + self.ttl + self.grace
    }

    fn is_held(&self, now: Instant) -> bool {
        now < self.hold_until()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    next_seq: u64,
    /// Messages in posting order, keyed by sequence number
    messages: BTreeMap<u64, StoredMessage>,
    index: HashMap<MessageId, u64>,
    claims: HashMap<ClaimId, StoredClaim>,
}

impl QueueState {
    fn lookup(&self, id: &MessageId, now: Instant) -> Option<&StoredMessage> {
        self.index
            .get(id)
            .and_then(|seq| self.messages.get(seq))
            .filter(|m| now < m.expires)
    }

    fn live_claim(&self, id: &ClaimId, now: Instant) -> Option<&StoredClaim> {
        self.claims.get(id).filter(|c| c.is_held(now))
    }

    /// Claim holding a message right now
    fn holder<'a>(&'a self, message: &'a StoredMessage, now: Instant) -> Option<&'a ClaimId> {
        message
            .claim
            .as_ref()
            .filter(|id| self.live_claim(id, now).is_some())
    }

    fn view(&self, message: &StoredMessage, now: Instant) -> Message {
        Message {
            id: message.id.clone(),
            body: message.body.clone(),
            claim_id: self.holder(message, now).cloned(),
            age: now.saturating_duration_since(message.created),
            ttl: message.ttl,
        }
    }

    /// Drop expired messages and claims whose hold has lapsed
    fn purge(&mut self, now: Instant) {
        let lapsed: Vec<ClaimId> = self
            .claims
            .iter()
            .filter(|(_, claim)| !claim.is_held(now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in lapsed {
            self.release(&id);
        }

        let expired: Vec<u64> = self
            .messages
            .iter()
            .filter(|(_, m)| now >= m.expires)
            .map(|(seq, _)| *seq)
            .collect();
        for seq in expired {
            self.remove(seq);
        }
    }

    fn remove(&mut self, seq: u64) {
        if let Some(message) = self.messages.remove(&seq) {
            self.index.remove(&message.id);
            if let Some(claim) = message.claim.and_then(|id| self.claims.get_mut(&id)) {
                claim.messages.retain(|m| m != &message.id);
            }
        }
    }

    fn release(&mut self, id: &ClaimId) -> bool {
        let Some(claim) = self.claims.remove(id) else {
            return false;
        };
        for message_id in &claim.messages {
            if let Some(message) = self
                .index
                .get(message_id)
                .and_then(|seq| self.messages.get_mut(seq))
            {
                if message.claim.as_ref() == Some(id) {
                    message.claim = None;
                }
            }
        }
        true
    }
}

// ============================================================================
// Memory Queue
// ============================================================================

/// Shared in-memory queue
#[derive(Debug, Clone)]
pub struct MemoryQueue {
    name: String,
    client_id: Uuid,
    state: Arc<RwLock<QueueState>>,
}

impl MemoryQueue {
    /// Empty queue with a random client identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client_id: Uuid::new_v4(),
            state: Arc::new(RwLock::new(QueueState::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle on the same queue acting as `client_id`
    #[must_use]
    pub fn as_client(&self, client_id: Uuid) -> Self {
        Self {
            name: self.name.clone(),
            client_id,
            state: Arc::clone(&self.state),
        }
    }

    /// Live messages, claimed or not
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let state = self.state.read().await;
        state.messages.values().filter(|m| now < m.expires).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl QueueService for MemoryQueue {
    fn client_id(&self) -> Uuid {
        self.client_id
    }

    async fn post(&self, messages: Vec<NewMessage>) -> Result<MessagesCreated> {
        for message in &messages {
            message.validate()?;
        }

        let now = Instant::now();
        let mut state = self.state.write().await;
        state.purge(now);

        let mut ids = Vec::with_capacity(messages.len());
        for message in messages {
            let seq = state.next_seq;
            state.next_seq += 1;

            let id = MessageId::new(new_id());
            state.index.insert(id.clone(), seq);
            state.messages.insert(
                seq,
                StoredMessage {
                    id: id.clone(),
                    body: message.body,
                    author: self.client_id,
                    ttl: message.ttl,
                    created: now,
                    expires: now + message.ttl,
                    claim: None,
                },
            );
            ids.push(id);
        }

        debug!(queue = %self.name, count = ids.len(), "Posted messages");
        Ok(MessagesCreated::new(ids))
    }

    async fn stream_page(&self, options: &StreamOptions) -> Result<Page<Message>> {
        options.validate()?;

        let after = match options.marker() {
            Some(marker) => Some(marker.as_str().parse::<u64>().map_err(|_| {
                Error::invalid_argument(format!("Invalid stream marker '{marker}'"))
            })?),
            None => None,
        };
        let limit = options.effective_limit() as usize;

        let now = Instant::now();
        let state = self.state.read().await;

        let mut candidates = state
            .messages
            .range(after.map_or(0, |seq| seq + 1)..)
            .filter(|(_, m)| now < m.expires)
            .filter(|(_, m)| options.include_claimed || state.holder(m, now).is_none());

        let scanned: Vec<(u64, &StoredMessage)> =
            candidates.by_ref().take(limit).map(|(seq, m)| (*seq, m)).collect();
        let more = candidates.next().is_some();

        let marker = match scanned.last() {
            Some((seq, _)) if more => Some(Marker::new(seq.to_string())),
            _ => None,
        };
        let items = scanned
            .into_iter()
            .filter(|(_, m)| options.echo || m.author != self.client_id)
            .map(|(_, m)| state.view(m, now))
            .collect();

        Ok(Page::new(items, marker))
    }

    async fn get(&self, id: &MessageId) -> Result<Option<Message>> {
        let now = Instant::now();
        let state = self.state.read().await;
        Ok(state.lookup(id, now).map(|m| state.view(m, now)))
    }

    async fn list(&self, ids: &[MessageId]) -> Result<Vec<Message>> {
        let now = Instant::now();
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.lookup(id, now))
            .map(|m| state.view(m, now))
            .collect())
    }

    async fn delete(&self, id: &MessageId) -> Result<()> {
        let mut state = self.state.write().await;
        state.purge(Instant::now());
        if let Some(seq) = state.index.get(id).copied() {
            state.remove(seq);
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[MessageId]) -> Result<()> {
        let mut state = self.state.write().await;
        state.purge(Instant::now());
        for id in ids {
            if let Some(seq) = state.index.get(id).copied() {
                state.remove(seq);
            }
        }
        Ok(())
    }

    async fn delete_by_claim(&self, id: &MessageId, claim_id: &ClaimId) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.write().await;
        state.purge(now);

        let Some(seq) = state.index.get(id).copied() else {
            return Ok(());
        };
        let holder = state
            .messages
            .get(&seq)
            .and_then(|m| state.holder(m, now))
            .cloned();

        match holder {
            None => Err(Error::not_claimed(id.as_str())),
            Some(holder) if &holder != claim_id => Err(Error::claim_mismatch(
                id.as_str(),
                claim_id.as_str(),
                Some(holder.to_string()),
            )),
            Some(_) => {
                state.remove(seq);
                debug!(queue = %self.name, message = %id, claim = %claim_id, "Deleted claimed message");
                Ok(())
            }
        }
    }

    async fn claim(&self, request: ClaimRequest) -> Result<Vec<Message>> {
        request.validate()?;

        let now = Instant::now();
        let mut state = self.state.write().await;
        state.purge(now);

        let eligible: Vec<u64> = state
            .messages
            .iter()
            .filter(|(_, m)| m.claim.is_none())
            .map(|(seq, _)| *seq)
            .take(request.limit as usize)
            .collect();

        if eligible.is_empty() {
            debug!(queue = %self.name, "No messages available to claim");
            return Ok(Vec::new());
        }

        let claim_id = ClaimId::new(new_id());
        let hold_until = now + request.hold();
        let mut claimed = Vec::with_capacity(eligible.len());
        for seq in eligible {
            if let Some(message) = state.messages.get_mut(&seq) {
                message.claim = Some(claim_id.clone());
                message.expires = message.expires.max(hold_until);
                claimed.push(message.id.clone());
            }
        }

        state.claims.insert(
            claim_id.clone(),
            StoredClaim {
                ttl: request.ttl,
                grace: request.grace,
                created: now,
                messages: claimed.clone(),
            },
        );

        debug!(queue = %self.name, claim = %claim_id, count = claimed.len(), "Claimed messages");
        Ok(claimed
            .iter()
            .filter_map(|id| state.lookup(id, now))
            .map(|m| state.view(m, now))
            .collect())
    }

    async fn get_claim(&self, id: &ClaimId) -> Result<Option<Claim>> {
        let now = Instant::now();
        let state = self.state.read().await;
        Ok(state.live_claim(id, now).map(|claim| Claim {
            id: id.clone(),
            ttl: claim.ttl,
            grace: Some(claim.grace),
            age: now.saturating_duration_since(claim.created),
            messages: claim
                .messages
                .iter()
                .filter_map(|m| state.lookup(m, now))
                .map(|m| state.view(m, now))
                .collect(),
        }))
    }

    async fn renew(&self, id: &ClaimId, ttl: Duration, grace: Duration) -> Result<bool> {
        ClaimRequest::new(ttl, grace).validate()?;

        let now = Instant::now();
        let mut state = self.state.write().await;
        state.purge(now);

        let Some(claim) = state.claims.get_mut(id) else {
            return Ok(false);
        };
        claim.ttl = ttl;
        claim.grace = grace;
        claim.created = now;
        let hold_until = claim.hold_until();
        let held = claim.messages.clone();

        for message_id in &held {
            if let Some(message) = state
                .index
                .get(message_id)
                .copied()
                .and_then(|seq| state.messages.get_mut(&seq))
            {
                message.expires = message.expires.max(hold_until);
            }
        }

        debug!(queue = %self.name, claim = %id, "Renewed claim");
        Ok(true)
    }

    async fn release(&self, id: &ClaimId) -> Result<()> {
        let mut state = self.state.write().await;
        state.purge(Instant::now());
        if state.release(id) {
            debug!(queue = %self.name, claim = %id, "Released claim");
        }
        Ok(())
    }
}
