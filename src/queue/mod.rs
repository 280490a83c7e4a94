//! Message queue module
//!
//! At-least-once queues with claims and leases.
//!
//! # Overview
//!
//! Producers post messages; consumers either stream them (read-only,
//! marker paginated) or claim a batch. A claim hides its messages from
//! other consumers for `ttl + grace`; the claimant deletes each message it
//! finishes by presenting the claim id, or releases the claim to hand the
//! rest back.
//!
//! Two implementations share the [`QueueService`] contract:
//! - [`RemoteQueue`] speaks the Marconi v1 REST API through a
//!   [`RequestExecutor`](crate::http::RequestExecutor)
//! - [`MemoryQueue`] keeps the whole state machine in process

mod memory;
mod remote;
mod service;
mod types;

pub use memory::MemoryQueue;
pub use remote::{
    validate_queue_name, QueueClient, QueueInfo, RemoteQueue, CLIENT_ID_HEADER, MAX_QUEUE_NAME_LEN,
};
pub use service::{MessagePages, MessageStream, QueueService};
pub use types::{
    Claim, ClaimId, ClaimRequest, Message, MessageId, MessagesCreated, NewMessage, StreamOptions,
    DEFAULT_PAGE_LIMIT, MAX_CLAIM_TTL, MAX_MESSAGE_TTL, MAX_PAGE_LIMIT, MIN_TTL,
};
