// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # nimbus
//!
//! Client core for multi-tenant cloud service APIs (compute, networking,
//! storage, messaging, CDN, autoscaling) that page their collections with
//! markers.
//!
//! ## Features
//!
//! - **Cursor pagination**: walk any marker-paginated collection lazily,
//!   page by page or item by item
//! - **Not-found normalization**: a missing collection lists as empty, a
//!   missing resource reads as `None`
//! - **Message queues**: post, stream, claim, delete-by-claim, renew and
//!   release, against a remote provider or in process
//! - **HTTP executor**: retries with backoff and client-side rate limiting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nimbus::queue::{ClaimRequest, QueueClient, QueueService};
//! use nimbus::http::HttpClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> nimbus::Result<()> {
//!     let config = HttpClientConfig::builder()
//!         .base_url("https://queues.example.com")
//!         .header("X-Auth-Token", "...")
//!         .build();
//!     let queue = QueueClient::from_config(config)?.queue("jobs")?;
//!
//!     for message in queue.claim(ClaimRequest::secs(300, 60, 10)).await? {
//!         // process message.body
//!         if let Some(claim) = &message.claim_id {
//!             queue.delete_by_claim(&message.id, claim).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        ServiceClient              QueueService                  │
//! │  list() get() delete()     post() stream() claim() release()    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────────┬─────────────┴──────────┬───────────────────────┐
//! │   Pagination   │         Codec          │        Queue          │
//! ├────────────────┼────────────────────────┼───────────────────────┤
//! │ Cursor         │ JsonPageCodec          │ RemoteQueue (REST)    │
//! │ PageFetcher    │ Marker field / links   │ MemoryQueue           │
//! │ ListOptions    │ href parsing           │ Claims, TTL, grace    │
//! └────────────────┴────────────────────────┴───────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   RequestExecutor: HttpClient (retry, backoff, rate limit)      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP request executor with retry and rate limiting
pub mod http;

/// Page decoding
pub mod codec;

/// Marker-based cursor pagination
pub mod pagination;

/// Not-found normalization
pub mod fallback;

/// Generic service client
pub mod service;

/// Message queues with claims
pub mod queue;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use fallback::NotFoundExt;
pub use pagination::{Cursor, ListOptions, Marker, Page, PageFetcher, PageOptions};
pub use service::ServiceClient;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
