//! Single-flight query runner.
//!
//! [`QueryClient`] runs at most one query at a time:
//!
//! - Starting a new query cancels a pending one, and the subscriber sees
//!   that cancel before the new query's start.
//! - Successful responses are cached by request fingerprint; a warm cache
//!   answers synchronously with no dispatch and no session churn.
//! - Completions belonging to a superseded session are dropped rather than
//!   delivered late.
//! - Click analytics ride a fire-and-forget side channel that never
//!   surfaces failures.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::client::cache::ResponseCache;
use crate::client::fingerprint::RequestFingerprint;
use crate::client::params::{self, ParamMap};
use crate::client::session::{QuerySession, SessionState};
use crate::client::transport::{
    Method, Transport, TransportFailure, TransportRequest, TransportResponse,
};
use crate::client::{ClientConfig, QueryError};
use crate::model::types::{SearchKind, SearchPayload};

/// Subscriber for query lifecycle events.
///
/// Every started query resolves with exactly one of finish, cancel, or
/// fail. Cache hits skip the start and deliver finish directly. Methods
/// default to no-ops so subscribers implement only what they care about.
pub trait QueryObserver: Send + Sync {
    fn on_start(&self, _query: &str, _kind: SearchKind) {}
    fn on_finish(&self, _query: &str, _kind: SearchKind, _payload: &Arc<SearchPayload>) {}
    fn on_cancel(&self, _query: &str, _kind: SearchKind) {}
    fn on_fail(&self, _query: &str, _kind: SearchKind, _error: &QueryError) {}
}

/// Runs queries against the search service, one at a time.
///
/// The client is cheap to share: hand out `Arc<QueryClient>` and call it
/// from wherever input arrives. State lives behind a mutex; the transport
/// call itself runs as a task on the supplied runtime handle.
pub struct QueryClient {
    self_ref: Weak<QueryClient>,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
    observer: RwLock<Option<Weak<dyn QueryObserver>>>,
    session: Mutex<Option<QuerySession>>,
    session_seq: AtomicU64,
    runtime: tokio::runtime::Handle,
}

impl QueryClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        cache: Arc<ResponseCache>,
        runtime: tokio::runtime::Handle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            config,
            transport,
            cache,
            observer: RwLock::new(None),
            session: Mutex::new(None),
            session_seq: AtomicU64::new(0),
            runtime,
        })
    }

    /// Subscribe to lifecycle events. Held weakly, so an observer that owns
    /// this client can subscribe without creating a cycle.
    pub fn set_observer<O: QueryObserver + 'static>(&self, observer: &Arc<O>) {
        let observer: Arc<dyn QueryObserver> = observer.clone();
        let weak: Weak<dyn QueryObserver> = Arc::downgrade(&observer);
        *self.observer.write() = Some(weak);
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn observer(&self) -> Option<Arc<dyn QueryObserver>> {
        self.observer.read().as_ref().and_then(Weak::upgrade)
    }

    /// Run a search query for the first page at the configured page size.
    pub fn search_query(&self, query: &str) -> Result<(), QueryError> {
        self.run_search(
            query,
            SearchKind::Search,
            1,
            self.config.per_page,
            &ParamMap::new(),
        )
    }

    /// Run a search query for a specific page window.
    pub fn search_query_page(&self, query: &str, page: u64, per_page: u64) -> Result<(), QueryError> {
        self.run_search(query, SearchKind::Search, page, per_page, &ParamMap::new())
    }

    /// Run a suggest query. Suggest queries never page.
    pub fn suggest_query(&self, query: &str) -> Result<(), QueryError> {
        self.run_search(
            query,
            SearchKind::Suggest,
            1,
            self.config.per_page,
            &ParamMap::new(),
        )
    }

    /// Run a query.
    ///
    /// A warm cache answers synchronously: finish is emitted with the
    /// cached payload, nothing is dispatched, and any in-flight session is
    /// left alone. Otherwise a pending session is cancelled (its cancel
    /// event fires before the new start), a fresh session goes in flight,
    /// and the transport call is spawned.
    ///
    /// `Err` is returned only for caller mistakes — parameters that cannot
    /// be query-encoded — and means nothing was dispatched.
    pub fn run_search(
        &self,
        query: &str,
        kind: SearchKind,
        page: u64,
        per_page: u64,
        params: &ParamMap,
    ) -> Result<(), QueryError> {
        let url = self.request_url(query, kind, page, per_page, params)?;
        let fingerprint = RequestFingerprint::new(query, kind, page, per_page, params.clone());

        if let Some(payload) = self.cache.get(&fingerprint) {
            debug!(query, %kind, "cache hit, answering without dispatch");
            if let Some(observer) = self.observer() {
                observer.on_finish(query, kind, &payload);
            }
            return Ok(());
        }

        // Supersede any pending session before the new one becomes visible.
        let canceled = {
            let mut slot = self.session.lock();
            match slot.as_mut() {
                Some(prev) if prev.state == SessionState::InFlight => {
                    prev.resolve(SessionState::Canceled);
                    Some((prev.query.clone(), prev.kind))
                }
                _ => None,
            }
        };
        if let Some((prev_query, prev_kind)) = canceled
            && let Some(observer) = self.observer()
        {
            observer.on_cancel(&prev_query, prev_kind);
        }

        let id = self.session_seq.fetch_add(1, Ordering::Relaxed) + 1;
        *self.session.lock() = Some(QuerySession::new(id, fingerprint));
        if let Some(observer) = self.observer() {
            observer.on_start(query, kind);
        }

        let Some(client) = self.self_ref.upgrade() else {
            return Ok(());
        };
        let request = TransportRequest {
            method: Method::Get,
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: None,
            timeout: self.config.timeout,
        };
        let handle = self.runtime.spawn(async move {
            let outcome = client.transport.execute(request).await;
            client.complete(id, outcome);
        });

        // Attach the abort handle unless the session was already superseded
        // by a re-entrant call from the observer.
        let mut slot = self.session.lock();
        if let Some(session) = slot.as_mut()
            && session.id == id
            && session.state == SessionState::InFlight
        {
            session.abort = Some(handle.abort_handle());
        } else {
            handle.abort();
        }
        Ok(())
    }

    /// Cancel the in-flight query, if any. The cancel event fires
    /// synchronously; a transport completion that slips through later is
    /// dropped by session identity.
    pub fn cancel(&self) {
        let canceled = {
            let mut slot = self.session.lock();
            match slot.as_mut() {
                Some(session) if session.state == SessionState::InFlight => {
                    session.resolve(SessionState::Canceled);
                    Some((session.query.clone(), session.kind))
                }
                _ => None,
            }
        };
        if let Some((query, kind)) = canceled
            && let Some(observer) = self.observer()
        {
            observer.on_cancel(&query, kind);
        }
    }

    /// Empty the response cache. An in-flight session is unaffected.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Record that the user selected `document_id` from the results of
    /// `query`. Best-effort telemetry: failures are logged and swallowed.
    pub fn post_click_analytics(&self, query: &str, kind: SearchKind, document_id: &str) {
        if !self.config.analytics {
            return;
        }
        let path = match kind {
            SearchKind::Suggest => "pas",
            SearchKind::Undefined | SearchKind::Search => "pc",
        };
        let endpoint = format!(
            "{}/api/v1/public/analytics/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        );
        let mut url = match Url::parse(&endpoint) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "analytics url rejected");
                return;
            }
        };
        url.query_pairs_mut()
            .append_pair("engine_key", &self.config.engine_key)
            .append_pair("q", query)
            .append_pair("doc_id", document_id);

        let request = TransportRequest {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: self.config.timeout,
        };
        let transport = Arc::clone(&self.transport);
        self.runtime.spawn(async move {
            match transport.execute(request).await {
                Ok(response) if response.is_success() => {}
                Ok(response) => debug!(status = response.status, "analytics post rejected"),
                Err(e) => debug!(error = %e, "analytics post failed"),
            }
        });
    }

    /// Resolve a transport completion for session `id`. Completions whose
    /// session has been superseded or already resolved are dropped here.
    fn complete(&self, id: u64, outcome: Result<TransportResponse, TransportFailure>) {
        let (query, kind, fingerprint, resolved) = {
            let mut slot = self.session.lock();
            let Some(session) = slot.as_mut() else {
                return;
            };
            if session.id != id || session.state != SessionState::InFlight {
                debug!(session = id, "discarding completion for superseded session");
                return;
            }
            let resolved = classify(outcome, &self.config);
            session.state = match resolved {
                Ok(_) => SessionState::Succeeded,
                Err(_) => SessionState::Failed,
            };
            session.abort = None;
            (
                session.query.clone(),
                session.kind,
                session.fingerprint.clone(),
                resolved,
            )
        };

        match resolved {
            Ok(payload) => {
                let payload = self.cache.insert(fingerprint, payload);
                if let Some(observer) = self.observer() {
                    observer.on_finish(&query, kind, &payload);
                }
            }
            Err(error) => {
                warn!(query, %kind, error = %error, "query failed");
                if let Some(observer) = self.observer() {
                    observer.on_fail(&query, kind, &error);
                }
            }
        }
    }

    fn request_url(
        &self,
        query: &str,
        kind: SearchKind,
        page: u64,
        per_page: u64,
        params: &ParamMap,
    ) -> Result<Url, QueryError> {
        let endpoint = format!(
            "{}/api/v1/public/engines/{}.json",
            self.config.base_url.trim_end_matches('/'),
            kind.endpoint()
        );
        let mut url = Url::parse(&endpoint).map_err(|e| QueryError::InvalidParameter {
            key: "base_url".to_string(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("engine_key", &self.config.engine_key);
            pairs.append_pair("q", query);
            if kind == SearchKind::Search {
                pairs.append_pair("page", &page.to_string());
                pairs.append_pair("per_page", &per_page.to_string());
            }
        }
        params::append_query_pairs(&mut url, params)?;
        Ok(url)
    }
}

/// Map a transport outcome to a payload or a classified failure.
fn classify(
    outcome: Result<TransportResponse, TransportFailure>,
    config: &ClientConfig,
) -> Result<SearchPayload, QueryError> {
    match outcome {
        Ok(response) if response.is_success() => {
            serde_json::from_slice::<SearchPayload>(&response.body)
                .map_err(|e| QueryError::Decode(e.to_string()))
        }
        Ok(response) => Err(QueryError::HttpStatus {
            status: response.status,
            body: response.body,
        }),
        Err(TransportFailure::Timeout) => Err(QueryError::Timeout(config.timeout)),
        Err(TransportFailure::Connect(message)) => Err(QueryError::Transport(message)),
    }
}
