//! Per-request lifecycle state.

use tokio::task::AbortHandle;

use crate::client::fingerprint::RequestFingerprint;
use crate::model::types::SearchKind;

/// States a session moves through. `InFlight` is the only non-terminal
/// state; the owning client is idle whenever it holds no in-flight session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InFlight,
    Succeeded,
    Canceled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::InFlight)
    }
}

/// One request attempt, from dispatch to terminal resolution.
///
/// The owning client holds at most one of these at a time. The `id` tags
/// the dispatched transport task so a completion arriving for a superseded
/// session can be recognized and dropped instead of delivered late.
#[derive(Debug)]
pub struct QuerySession {
    pub id: u64,
    pub query: String,
    pub kind: SearchKind,
    pub fingerprint: RequestFingerprint,
    pub state: SessionState,
    pub abort: Option<AbortHandle>,
}

impl QuerySession {
    pub fn new(id: u64, fingerprint: RequestFingerprint) -> Self {
        Self {
            id,
            query: fingerprint.query.clone(),
            kind: fingerprint.kind,
            state: SessionState::InFlight,
            abort: None,
            fingerprint,
        }
    }

    /// Move to a terminal state, aborting the transport task if one is
    /// still attached. Aborting is best-effort at the wire; the state
    /// change here is what makes the resolution observable.
    pub fn resolve(&mut self, state: SessionState) {
        debug_assert!(state.is_terminal());
        self.state = state;
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
    }
}
