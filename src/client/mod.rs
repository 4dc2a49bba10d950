//! Query lifecycle layer.
//!
//! This module provides everything between the caller's query text and the
//! wire:
//!
//! - **[`params`]**: caller-supplied request parameters and their URL
//!   query-string encoding.
//! - **[`fingerprint`]**: structural request identity for caching and dedup.
//! - **[`cache`]**: bounded LRU cache from fingerprint to parsed payload.
//! - **[`transport`]**: the HTTP seam — a trait plus the `reqwest`-backed
//!   production implementation.
//! - **[`session`]**: per-request lifecycle state.
//! - **[`lifecycle`]**: [`QueryClient`], the single-flight query runner.

pub mod cache;
pub mod fingerprint;
pub mod lifecycle;
pub mod params;
pub mod session;
pub mod transport;

use std::time::Duration;

use thiserror::Error;

pub use cache::{CacheStats, ResponseCache};
pub use fingerprint::RequestFingerprint;
pub use lifecycle::{QueryClient, QueryObserver};
pub use params::{ParamMap, ParamValue};
pub use transport::{HttpTransport, Transport};

/// Results requested per page when the caller does not say otherwise.
pub const DEFAULT_PER_PAGE: u64 = 20;

/// Transport deadline applied when the caller does not say otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while building or running a query.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// Server answered outside the 2xx range. The raw body is retained so
    /// callers can inspect the server's error document.
    #[error("server returned HTTP {status}")]
    HttpStatus { status: u16, body: Vec<u8> },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("could not decode response body: {0}")]
    Decode(String),

    #[error("parameter {key:?} cannot be encoded: {reason}")]
    InvalidParameter { key: String, reason: String },
}

/// Configuration for a [`QueryClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the search service, e.g. `https://search.example.com`.
    pub base_url: String,
    /// Key of the engine that queries run against.
    pub engine_key: String,
    /// Page size used by the convenience query methods.
    pub per_page: u64,
    /// Deadline handed to the transport for every request.
    pub timeout: Duration,
    /// Whether click analytics posts are dispatched at all.
    pub analytics: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, engine_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            engine_key: engine_key.into(),
            per_page: DEFAULT_PER_PAGE,
            timeout: DEFAULT_TIMEOUT,
            analytics: true,
        }
    }

    /// Build a config and apply `SEARCHFRONT_*` environment overrides.
    pub fn from_env(base_url: impl Into<String>, engine_key: impl Into<String>) -> Self {
        let mut cfg = Self::new(base_url, engine_key);
        if let Ok(val) = dotenvy::var("SEARCHFRONT_BASE_URL") {
            cfg.base_url = val;
        }
        if let Ok(val) = dotenvy::var("SEARCHFRONT_TIMEOUT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            cfg.timeout = Duration::from_millis(ms.max(1));
        }
        if let Ok(val) = dotenvy::var("SEARCHFRONT_PER_PAGE")
            && let Ok(per_page) = val.parse::<u64>()
        {
            cfg.per_page = per_page.max(1);
        }
        cfg
    }
}
