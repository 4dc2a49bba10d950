//! HTTP transport boundary.
//!
//! The lifecycle manager speaks to the network through the [`Transport`]
//! trait so tests can substitute a scripted double. [`HttpTransport`] is
//! the production implementation backed by `reqwest`. Retry, TLS, and
//! connection pooling are the transport's own business; the core only
//! hands over a request shape and classifies what comes back.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Method for a transport request. GETs carry no body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// Raw response from the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum TransportFailure {
    #[error("request deadline exceeded")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),
}

/// The seam between the lifecycle manager and the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure>;
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    pub fn new() -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("searchfront/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportFailure::Connect(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client (shared pool, custom TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Connect(err.to_string())
    }
}
