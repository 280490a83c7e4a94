//! Queue types
//!
//! Identifiers, messages, claims and the request values of the claim
//! protocol, together with their wire shapes.

use crate::codec::href;
use crate::error::{Error, Result};
use crate::pagination::{Marker, PageOptions};
use crate::types::{duration_secs, JsonValue, QueryPairs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Limits
// ============================================================================

/// Shortest message, claim or grace lifetime a provider accepts
pub const MIN_TTL: Duration = Duration::from_secs(60);

/// Longest claim or grace lifetime a provider accepts (12 hours)
pub const MAX_CLAIM_TTL: Duration = Duration::from_secs(43_200);

/// Longest message lifetime a provider accepts (14 days)
pub const MAX_MESSAGE_TTL: Duration = Duration::from_secs(1_209_600);

/// Most messages a single claim or stream page can return
pub const MAX_PAGE_LIMIT: u32 = 20;

/// Messages returned per claim or page when no limit is given
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Server-assigned message identity
    MessageId
);

string_id!(
    /// Server-assigned claim identity, valid for the lifetime of the claim
    ClaimId
);

// ============================================================================
// Messages
// ============================================================================

/// A message as read from a queue
///
/// Decoded from `{"href": ".../messages/<id>?claim_id=<claim>", "ttl": 300,
/// "age": 12, "body": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "MessageWire")]
pub struct Message {
    pub id: MessageId,
    /// Opaque payload
    pub body: JsonValue,
    /// Claim currently holding the message, if the provider reported one
    pub claim_id: Option<ClaimId>,
    pub age: Duration,
    pub ttl: Duration,
}

impl Message {
    pub fn is_claimed(&self) -> bool {
        self.claim_id.is_some()
    }
}

#[derive(Deserialize)]
struct MessageWire {
    href: String,
    #[serde(default)]
    ttl: u64,
    #[serde(default)]
    age: u64,
    #[serde(default)]
    body: JsonValue,
}

impl TryFrom<MessageWire> for Message {
    type Error = Error;

    fn try_from(wire: MessageWire) -> Result<Self> {
        Ok(Self {
            id: MessageId::new(href::last_segment(&wire.href)?),
            claim_id: href::query_param(&wire.href, "claim_id")?.map(ClaimId::new),
            body: wire.body,
            age: Duration::from_secs(wire.age),
            ttl: Duration::from_secs(wire.ttl),
        })
    }
}

/// A message to post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    pub body: JsonValue,
}

impl NewMessage {
    pub fn new(ttl: Duration, body: JsonValue) -> Self {
        Self { ttl, body }
    }

    /// Check the lifetime against provider bounds
    pub fn validate(&self) -> Result<()> {
        check_range("message ttl", self.ttl, MIN_TTL, MAX_MESSAGE_TTL)
    }
}

/// Ids assigned to posted messages, in posting order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesCreated {
    pub ids: Vec<MessageId>,
}

impl MessagesCreated {
    pub fn new(ids: Vec<MessageId>) -> Self {
        Self { ids }
    }

    /// Parse `{"resources": ["/v1/queues/q/messages/<id>", ...]}`
    pub fn from_resources(resources: &[String]) -> Result<Self> {
        resources
            .iter()
            .map(|href| href::last_segment(href).map(MessageId::new))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }
}

// ============================================================================
// Claims
// ============================================================================

/// A claim and the messages it holds
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    pub id: ClaimId,
    pub ttl: Duration,
    /// Grace period, when known (providers do not echo it back)
    pub grace: Option<Duration>,
    pub age: Duration,
    pub messages: Vec<Message>,
}

impl Claim {
    pub fn message_ids(&self) -> Vec<&MessageId> {
        self.messages.iter().map(|m| &m.id).collect()
    }
}

/// Parameters of a claim request
///
/// The claim is valid for `ttl`. Its messages stay invisible to other
/// consumers for `grace` past that, so an in-flight delete does not race
/// a new claimant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimRequest {
    #[serde(with = "duration_secs")]
    pub ttl: Duration,
    #[serde(with = "duration_secs")]
    pub grace: Duration,
    #[serde(skip)]
    pub limit: u32,
}

impl ClaimRequest {
    pub fn new(ttl: Duration, grace: Duration) -> Self {
        Self {
            ttl,
            grace,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Claim from whole seconds, e.g. `ClaimRequest::secs(300, 100, 1)`
    pub fn secs(ttl: u64, grace: u64, limit: u32) -> Self {
        Self::new(Duration::from_secs(ttl), Duration::from_secs(grace)).limit(limit)
    }

    /// Claim at most `limit` messages
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Time the claimed messages stay unavailable to other consumers
    pub fn hold(&self) -> Duration {
        self.ttl + self.grace
    }

    pub fn validate(&self) -> Result<()> {
        check_range("claim ttl", self.ttl, MIN_TTL, MAX_CLAIM_TTL)?;
        check_range("claim grace", self.grace, MIN_TTL, MAX_CLAIM_TTL)?;
        check_limit(self.limit)
    }
}

// ============================================================================
// Stream Options
// ============================================================================

/// Options for reading a queue page by page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Messages per page
    pub limit: Option<u32>,
    /// Marker to resume after
    pub marker: Option<Marker>,
    /// Include messages posted by the requesting client
    pub echo: bool,
    /// Include messages currently held by a claim
    pub include_claimed: bool,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn marker(mut self, marker: impl Into<Marker>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    #[must_use]
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    #[must_use]
    pub fn include_claimed(mut self, include_claimed: bool) -> Self {
        self.include_claimed = include_claimed;
        self
    }

    /// Page size with the provider default applied
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }
}

impl PageOptions for StreamOptions {
    fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    fn with_marker(&self, marker: Marker) -> Self {
        Self {
            marker: Some(marker),
            ..self.clone()
        }
    }

    fn to_query(&self) -> QueryPairs {
        let mut query = QueryPairs::new();
        if let Some(marker) = &self.marker {
            query.push(("marker".to_string(), marker.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query.push(("echo".to_string(), self.echo.to_string()));
        query.push((
            "include_claimed".to_string(),
            self.include_claimed.to_string(),
        ));
        query
    }

    fn validate(&self) -> Result<()> {
        self.limit.map_or(Ok(()), check_limit)
    }
}

fn check_limit(limit: u32) -> Result<()> {
    if (1..=MAX_PAGE_LIMIT).contains(&limit) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
        )))
    }
}

fn check_range(what: &str, value: Duration, min: Duration, max: Duration) -> Result<()> {
    if value < min || value > max {
        return Err(Error::invalid_argument(format!(
            "{what} must be between {}s and {}s, got {}s",
            min.as_secs(),
            max.as_secs(),
            value.as_secs()
        )));
    }
    Ok(())
}
