//! Result aggregation over the query lifecycle.
//!
//! [`SearchAggregator`] sits between user input and the presentation
//! layer. Incremental text changes are debounced into suggest queries;
//! explicit submits fire search queries immediately; "load more" advances
//! paging under the active scope. Lifecycle events from the client update
//! the sectioned record set and are re-exposed to the presentation layer
//! with the current data attached.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::client::lifecycle::QueryObserver;
use crate::client::params::{ParamMap, ParamValue};
use crate::client::{DEFAULT_PER_PAGE, QueryClient, QueryError};
use crate::model::types::{Record, SearchKind, SearchPayload, SectionKey};
use crate::results::records::RecordSet;
use crate::results::scope::ScopeSelection;

/// Quiet period between the last text change and the suggest dispatch.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// Per-query request parameters supplied by the caller.
pub type ParamsFn = Arc<dyn Fn(&str, SearchKind) -> ParamMap + Send + Sync>;

/// Configuration for a [`SearchAggregator`].
#[derive(Clone)]
pub struct AggregatorConfig {
    /// Declared section order; also the visibility filter for ingest.
    pub section_order: Vec<SectionKey>,
    /// Whether the presentation layer offers per-section scope filtering.
    pub scope_filtering: bool,
    /// Quiet period for incremental input.
    pub debounce: Duration,
    /// Page size requested for every query.
    pub per_page: u64,
    /// Extra request parameters merged into every dispatch.
    pub params: Option<ParamsFn>,
}

impl AggregatorConfig {
    pub fn new(section_order: Vec<SectionKey>) -> Self {
        Self {
            section_order,
            scope_filtering: false,
            debounce: DEBOUNCE_WINDOW,
            per_page: DEFAULT_PER_PAGE,
            params: None,
        }
    }
}

impl fmt::Debug for AggregatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorConfig")
            .field("section_order", &self.section_order)
            .field("scope_filtering", &self.scope_filtering)
            .field("debounce", &self.debounce)
            .field("per_page", &self.per_page)
            .field("params", &self.params.is_some())
            .finish()
    }
}

/// Presentation-layer subscriber.
///
/// The record set attached to [`on_results`](Self::on_results) is a
/// snapshot taken after the merge/replace, so handlers can render from it
/// without re-querying the aggregator. Methods default to no-ops.
pub trait SearchEventHandler: Send + Sync {
    fn on_start(&self, _query: &str, _kind: SearchKind) {}
    fn on_results(&self, _query: &str, _kind: SearchKind, _results: &RecordSet) {}
    fn on_cancel(&self, _query: &str, _kind: SearchKind) {}
    fn on_fail(&self, _query: &str, _kind: SearchKind, _error: &QueryError) {}
}

#[derive(Default)]
struct AggState {
    records: RecordSet,
    /// Query and kind of the most recent successful resolution.
    query: String,
    kind: SearchKind,
    scope: ScopeSelection,
    /// Latest submitted text; what the debounce timer will dispatch.
    live_text: String,
    /// Page of the most recent dispatch, for paging-vs-fresh decisions.
    requested_page: u64,
}

/// Maintains the current result set and drives the query client.
///
/// One aggregator owns one [`QueryClient`] subscription and assumes a
/// single logical thread of control: calls may arrive from anywhere, but
/// transport completions and timer firings are serialized through internal
/// locks, never re-entered concurrently with a caller's own update.
pub struct SearchAggregator {
    self_ref: Weak<SearchAggregator>,
    config: AggregatorConfig,
    client: Arc<QueryClient>,
    state: Mutex<AggState>,
    debounce_seq: AtomicU64,
    handler: RwLock<Option<Weak<dyn SearchEventHandler>>>,
    runtime: tokio::runtime::Handle,
}

impl SearchAggregator {
    /// Build an aggregator and subscribe it to `client`'s events.
    pub fn new(
        config: AggregatorConfig,
        client: Arc<QueryClient>,
        runtime: tokio::runtime::Handle,
    ) -> Arc<Self> {
        let aggregator = Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            config,
            client: Arc::clone(&client),
            state: Mutex::new(AggState::default()),
            debounce_seq: AtomicU64::new(0),
            handler: RwLock::new(None),
            runtime,
        });
        client.set_observer(&aggregator);
        aggregator
    }

    /// Subscribe the presentation layer. Held weakly.
    pub fn set_handler<H: SearchEventHandler + 'static>(&self, handler: &Arc<H>) {
        let handler: Arc<dyn SearchEventHandler> = handler.clone();
        let weak: Weak<dyn SearchEventHandler> = Arc::downgrade(&handler);
        *self.handler.write() = Some(weak);
    }

    fn handler(&self) -> Option<Arc<dyn SearchEventHandler>> {
        self.handler.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn client(&self) -> &Arc<QueryClient> {
        &self.client
    }

    /// Record a text change. The suggest query fires once the debounce
    /// window passes with no further change; intermediate texts never
    /// reach the wire.
    pub fn submit_query_text(&self, text: &str) {
        let generation = self.debounce_seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.lock().live_text = text.to_string();

        let weak = self.self_ref.clone();
        let window = self.config.debounce;
        self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let Some(aggregator) = weak.upgrade() else {
                return;
            };
            if aggregator.debounce_seq.load(Ordering::Acquire) != generation {
                // Superseded by newer input or an explicit submit.
                return;
            }
            let text = aggregator.state.lock().live_text.clone();
            aggregator.dispatch(&text, SearchKind::Suggest, 1, None);
        });
    }

    /// Explicit search submission: any pending suggest is dropped and the
    /// search query for page 1 dispatches immediately.
    pub fn submit_search(&self, text: &str) {
        self.debounce_seq.fetch_add(1, Ordering::AcqRel);
        self.state.lock().live_text = text.to_string();
        self.dispatch(text, SearchKind::Search, 1, None);
    }

    /// Fetch the next page of search results under the active scope.
    ///
    /// No-op when the last resolved query was not a search, or when no
    /// section order was declared. Under a narrowed scope only that
    /// section's next page is requested; under "all", every section pages
    /// together.
    pub fn load_next_search_result_page(&self) {
        if self.config.section_order.is_empty() {
            return;
        }
        let (query, scope, next_page) = {
            let state = self.state.lock();
            if state.kind != SearchKind::Search {
                return;
            }
            let next_page = match &state.scope {
                ScopeSelection::Section(key) => {
                    state
                        .records
                        .section(key)
                        .map(|section| section.page)
                        .unwrap_or(1)
                        + 1
                }
                ScopeSelection::All => state.records.max_page().max(1) + 1,
            };
            (state.query.clone(), state.scope.clone(), next_page)
        };
        let restriction = scope.section().map(|key| {
            (
                "document_types".to_string(),
                ParamValue::List(vec![ParamValue::Str(key.as_str().to_string())]),
            )
        });
        self.dispatch(&query, SearchKind::Search, next_page, restriction);
    }

    /// The data-level "load more" action for one section.
    ///
    /// When every section is shown, scope filtering is on, and more than
    /// one section holds records, this narrows the scope to `section`
    /// instead of fetching; the next call, now scoped, pages within it.
    /// In every other case it pages immediately.
    pub fn request_more(&self, section: &SectionKey) {
        let switch = {
            let state = self.state.lock();
            state.scope.is_all()
                && self.config.scope_filtering
                && state.records.populated_count(&self.config.section_order) > 1
        };
        if switch {
            debug!(%section, "narrowing scope instead of paging");
            self.set_scope(ScopeSelection::Section(section.clone()));
        } else {
            self.load_next_search_result_page();
        }
    }

    /// Whether `section` should offer another page.
    pub fn has_more_pages_in_section(&self, section: &SectionKey) -> bool {
        if self.config.section_order.is_empty() {
            return false;
        }
        let state = self.state.lock();
        if state.kind != SearchKind::Search {
            return false;
        }
        let Some(data) = state.records.section(section) else {
            return false;
        };
        if data.records.is_empty() || !data.has_more {
            return false;
        }
        self.section_visible(&state, section)
    }

    /// Records for `section` in server order; empty when unknown.
    pub fn records_for_section(&self, section: &SectionKey) -> Vec<Record> {
        self.state.lock().records.records(section).to_vec()
    }

    /// The record at `index` within `section`, when in bounds.
    pub fn record_at(&self, section: &SectionKey, index: usize) -> Option<Record> {
        self.state.lock().records.records(section).get(index).cloned()
    }

    /// Resolve a presentation-layer section index to its key.
    ///
    /// A narrowed scope always resolves index 0 to the scoped section;
    /// under "all", indexes walk the populated sections in declared order.
    pub fn section_for_display_index(&self, index: usize) -> Option<SectionKey> {
        if self.config.section_order.is_empty() {
            return None;
        }
        let state = self.state.lock();
        if let ScopeSelection::Section(key) = &state.scope {
            return (index == 0).then(|| key.clone());
        }
        state
            .records
            .populated(&self.config.section_order)
            .nth(index)
            .cloned()
    }

    /// Number of sections the presentation layer should show.
    pub fn visible_section_count(&self) -> usize {
        if self.config.section_order.is_empty() {
            return 0;
        }
        let state = self.state.lock();
        match &state.scope {
            ScopeSelection::Section(_) => 1,
            ScopeSelection::All => state.records.populated_count(&self.config.section_order),
        }
    }

    /// Change the scope filter. Affects only what is visible; nothing is
    /// refetched.
    pub fn set_scope(&self, scope: ScopeSelection) {
        self.state.lock().scope = scope;
    }

    pub fn scope(&self) -> ScopeSelection {
        self.state.lock().scope.clone()
    }

    /// Query text of the most recent successful resolution.
    pub fn results_query(&self) -> String {
        self.state.lock().query.clone()
    }

    /// Kind of the most recent successful resolution.
    pub fn results_kind(&self) -> SearchKind {
        self.state.lock().kind
    }

    /// A copy of the current record set.
    pub fn snapshot(&self) -> RecordSet {
        self.state.lock().records.clone()
    }

    /// Drop all records, e.g. when the results view is dismissed. Scope
    /// and resolved-query bookkeeping are kept.
    pub fn clear_results(&self) {
        self.state.lock().records.clear();
    }

    /// Record that the user selected `document_id` from the current
    /// results. Forwards to the client's best-effort analytics channel.
    pub fn post_click_analytics(&self, document_id: &str) {
        let (query, kind) = {
            let state = self.state.lock();
            (state.query.clone(), state.kind)
        };
        if query.is_empty() {
            return;
        }
        self.client.post_click_analytics(&query, kind, document_id);
    }

    fn dispatch(
        &self,
        query: &str,
        kind: SearchKind,
        page: u64,
        extra: Option<(String, ParamValue)>,
    ) {
        let mut params = self
            .config
            .params
            .as_ref()
            .map(|hook| hook(query, kind))
            .unwrap_or_default();
        if let Some((key, value)) = extra {
            params.insert(key, value);
        }
        self.state.lock().requested_page = page;
        if let Err(error) = self
            .client
            .run_search(query, kind, page, self.config.per_page, &params)
        {
            warn!(query, %kind, error = %error, "dispatch rejected");
            if let Some(handler) = self.handler() {
                handler.on_fail(query, kind, &error);
            }
        }
    }

    /// Visibility rule for paging affordances: a narrowed scope shows its
    /// own section; a single declared section is always visible; under
    /// "all", multiple populated sections page only when scope filtering
    /// is off.
    fn section_visible(&self, state: &AggState, section: &SectionKey) -> bool {
        if self.config.section_order.len() == 1 {
            return self.config.section_order[0] == *section;
        }
        match &state.scope {
            ScopeSelection::Section(key) => key == section,
            ScopeSelection::All => {
                state.records.populated_count(&self.config.section_order) <= 1
                    || !self.config.scope_filtering
            }
        }
    }
}

impl QueryObserver for SearchAggregator {
    fn on_start(&self, query: &str, kind: SearchKind) {
        if let Some(handler) = self.handler() {
            handler.on_start(query, kind);
        }
    }

    fn on_finish(&self, query: &str, kind: SearchKind, payload: &Arc<SearchPayload>) {
        let snapshot = {
            let mut state = self.state.lock();
            let paging = kind == SearchKind::Search && state.requested_page > 1;
            if paging {
                state.records.merge(payload, &self.config.section_order);
            } else {
                state.records.replace(payload, &self.config.section_order);
            }
            state.query = query.to_string();
            state.kind = kind;
            state.records.clone()
        };
        if let Some(handler) = self.handler() {
            handler.on_results(query, kind, &snapshot);
        }
    }

    fn on_cancel(&self, query: &str, kind: SearchKind) {
        if let Some(handler) = self.handler() {
            handler.on_cancel(query, kind);
        }
    }

    fn on_fail(&self, query: &str, kind: SearchKind, error: &QueryError) {
        // Record set stays as it was; the handler decides what to show.
        if let Some(handler) = self.handler() {
            handler.on_fail(query, kind, error);
        }
    }
}
