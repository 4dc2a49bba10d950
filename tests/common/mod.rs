//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use searchfront::client::transport::{
    Transport, TransportFailure, TransportRequest, TransportResponse,
};
use tokio::sync::Notify;

/// Scripted outcome for one expected request.
pub enum Reply {
    Json(&'static str),
    Status(u16, &'static str),
    Timeout,
    Connect,
}

struct ScriptEntry {
    matches: &'static str,
    gate: Option<Arc<Notify>>,
    reply: Reply,
}

/// Transport double that pairs each request with the first script entry
/// whose marker appears in the request URL, so concurrent tasks cannot
/// steal each other's replies. Gated entries park until released, which
/// lets tests control completion order.
#[derive(Default)]
pub struct ScriptedTransport {
    entries: Mutex<Vec<ScriptEntry>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, matches: &'static str, reply: Reply) {
        self.entries.lock().push(ScriptEntry {
            matches,
            gate: None,
            reply,
        });
    }

    /// Script a reply that waits for the returned handle to be notified
    /// before resolving.
    pub fn script_gated(&self, matches: &'static str, reply: Reply) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.entries.lock().push(ScriptEntry {
            matches,
            gate: Some(Arc::clone(&gate)),
            reply,
        });
        gate
    }

    /// URLs of every dispatched request, in dispatch order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure> {
        self.requests.lock().push(request.url.clone());
        let entry = {
            let mut entries = self.entries.lock();
            let index = entries
                .iter()
                .position(|entry| request.url.contains(entry.matches))
                .unwrap_or_else(|| panic!("no scripted reply for {}", request.url));
            entries.remove(index)
        };
        if let Some(gate) = entry.gate {
            gate.notified().await;
        }
        match entry.reply {
            Reply::Json(body) => Ok(TransportResponse {
                status: 200,
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            }),
            Reply::Status(status, body) => Ok(TransportResponse {
                status,
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            }),
            Reply::Timeout => Err(TransportFailure::Timeout),
            Reply::Connect => Err(TransportFailure::Connect("connection refused".to_string())),
        }
    }
}

/// Poll `condition` until it holds or a generous deadline passes.
pub async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {description}");
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
