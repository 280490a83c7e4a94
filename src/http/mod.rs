//! HTTP module
//!
//! The request executor boundary and its reqwest implementation.
//!
//! # Features
//!
//! - **Executor Contract**: `RequestExecutor` is the only way the core reaches a provider
//! - **Status Classification**: non-2xx responses become typed errors
//! - **Automatic Retries**: configurable backoff for 429/5xx/timeouts
//! - **Rate Limiting**: token bucket rate limiter using governor

mod client;
mod executor;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RetryPolicy};
pub use executor::{ApiRequest, ApiResponse, RequestExecutor};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
