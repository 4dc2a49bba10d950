//! Client-side search SDK.
//!
//! `searchfront` talks to a remote search API and exposes paged, sectioned
//! results to a presentation layer. It renders nothing itself: the crate
//! owns the query lifecycle and the authoritative result set, and a UI of
//! the caller's choosing subscribes to typed events and queries the data.
//!
//! The crate is split into three layers:
//!
//! - **[`model`]**: wire-level payload structs shared across the crate.
//! - **[`client`]**: the query lifecycle. [`client::QueryClient`] runs at
//!   most one query at a time, cancels superseded work, answers repeats
//!   from a fingerprint cache, and classifies failures.
//! - **[`results`]**: aggregation. [`results::SearchAggregator`] consumes
//!   lifecycle events, debounces incremental input, merges paged results,
//!   and answers section/row/scope queries.
//!
//! A typical setup wires the pieces together once at startup:
//!
//! ```no_run
//! use std::sync::Arc;
//! use searchfront::client::{ClientConfig, QueryClient, ResponseCache};
//! use searchfront::client::transport::HttpTransport;
//! use searchfront::model::types::SectionKey;
//! use searchfront::results::{AggregatorConfig, SearchAggregator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Runtime::new()?;
//! let transport = Arc::new(HttpTransport::new()?);
//! let client = QueryClient::new(
//!     ClientConfig::new("https://search.example.com", "engine-key"),
//!     transport,
//!     ResponseCache::shared(),
//!     runtime.handle().clone(),
//! );
//! let aggregator = SearchAggregator::new(
//!     AggregatorConfig::new(vec![SectionKey::from("article"), SectionKey::from("page")]),
//!     client,
//!     runtime.handle().clone(),
//! );
//! aggregator.submit_query_text("rust");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod model;
pub mod results;

pub use client::{ClientConfig, QueryClient, QueryError, QueryObserver, ResponseCache};
pub use model::types::{Record, SearchKind, SearchPayload, SectionKey};
pub use results::{AggregatorConfig, ScopeSelection, SearchAggregator, SearchEventHandler};
