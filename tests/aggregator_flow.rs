//! Aggregation behavior against a scripted transport: debounce
//! coalescing, wholesale-replace vs. paging merge, has-more visibility,
//! and the scope-narrowing "load more" path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Reply, ScriptedTransport, init_tracing, wait_until};
use parking_lot::Mutex;
use searchfront::client::{ClientConfig, QueryClient, QueryError, ResponseCache};
use searchfront::model::types::{SearchKind, SectionKey};
use searchfront::results::{AggregatorConfig, RecordSet, ScopeSelection, SearchAggregator};

const PAGE_ONE: &str = r#"{
    "record": {"article": [{"id": "1"}], "page": [{"id": "2"}]},
    "hasMore": {"article": true, "page": false}
}"#;
const PAGE_TWO: &str = r#"{"record": {"article": [{"id": "3"}]}}"#;

/// Handler that records every event in delivery order and keeps the last
/// result snapshot.
#[derive(Default)]
struct HandlerLog {
    events: Mutex<Vec<String>>,
    last: Mutex<Option<RecordSet>>,
}

impl HandlerLog {
    fn snapshot(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn results_seen(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with("results"))
            .count()
    }

    fn push(&self, line: String) {
        self.events.lock().push(line);
    }
}

impl searchfront::results::SearchEventHandler for HandlerLog {
    fn on_start(&self, query: &str, kind: SearchKind) {
        self.push(format!("start {kind} {query}"));
    }

    fn on_results(&self, query: &str, kind: SearchKind, results: &RecordSet) {
        self.push(format!("results {kind} {query}"));
        *self.last.lock() = Some(results.clone());
    }

    fn on_cancel(&self, query: &str, kind: SearchKind) {
        self.push(format!("cancel {kind} {query}"));
    }

    fn on_fail(&self, query: &str, kind: SearchKind, _error: &QueryError) {
        self.push(format!("fail {kind} {query}"));
    }
}

fn two_section_config() -> AggregatorConfig {
    let mut config = AggregatorConfig::new(vec![
        SectionKey::from("article"),
        SectionKey::from("page"),
    ]);
    // Keep test runs fast; the production default stays at 250ms.
    config.debounce = Duration::from_millis(30);
    config
}

fn setup(
    transport: Arc<ScriptedTransport>,
    config: AggregatorConfig,
) -> (Arc<SearchAggregator>, Arc<HandlerLog>) {
    init_tracing();
    let client = QueryClient::new(
        ClientConfig::new("https://search.test", "engine-abc"),
        transport,
        Arc::new(ResponseCache::new(16)),
        tokio::runtime::Handle::current(),
    );
    let aggregator = SearchAggregator::new(config, client, tokio::runtime::Handle::current());
    let log = Arc::new(HandlerLog::default());
    aggregator.set_handler(&log);
    (aggregator, log)
}

fn ids(aggregator: &SearchAggregator, section: &str) -> Vec<String> {
    aggregator
        .records_for_section(&SectionKey::from(section))
        .iter()
        .filter_map(|r| r.id().map(str::to_string))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rapid_input_coalesces_into_one_suggest() {
    let transport = ScriptedTransport::new();
    transport.script("q=cats", Reply::Json(PAGE_ONE));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());

    aggregator.submit_query_text("c");
    aggregator.submit_query_text("ca");
    aggregator.submit_query_text("cats");
    wait_until("debounced suggest to finish", || log.results_seen() >= 1).await;

    // Let any stray timers expire; nothing further may dispatch.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.request_count(), 1);
    let request = &transport.requests()[0];
    assert!(request.contains("/engines/suggest.json"));
    assert!(request.contains("q=cats"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn explicit_submit_preempts_the_pending_suggest() {
    let transport = ScriptedTransport::new();
    transport.script("search.json", Reply::Json(PAGE_ONE));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());

    aggregator.submit_query_text("cat");
    aggregator.submit_search("cats");
    wait_until("search to finish", || log.results_seen() >= 1).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.request_count(), 1, "the pending suggest must never dispatch");
    assert!(transport.requests()[0].contains("/engines/search.json"));
    assert_eq!(aggregator.results_kind(), SearchKind::Search);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn paging_appends_without_touching_other_sections() {
    let transport = ScriptedTransport::new();
    transport.script("page=1", Reply::Json(PAGE_ONE));
    transport.script("page=2", Reply::Json(PAGE_TWO));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());
    let article = SectionKey::from("article");
    let page = SectionKey::from("page");

    aggregator.submit_search("cats");
    wait_until("page 1 to land", || log.results_seen() >= 1).await;

    assert_eq!(ids(&aggregator, "article"), vec!["1"]);
    assert_eq!(ids(&aggregator, "page"), vec!["2"]);
    assert!(aggregator.has_more_pages_in_section(&article));
    assert!(!aggregator.has_more_pages_in_section(&page));

    aggregator.load_next_search_result_page();
    wait_until("page 2 to land", || log.results_seen() >= 2).await;

    assert_eq!(ids(&aggregator, "article"), vec!["1", "3"]);
    assert_eq!(ids(&aggregator, "page"), vec!["2"], "unpaged sections keep their records");
    assert!(
        !aggregator.has_more_pages_in_section(&article),
        "a page without metadata means no further pages"
    );
    assert!(transport.requests()[1].contains("page=2"));

    // The snapshot handed to the handler matches the queryable state.
    let attached = log.last.lock().clone().expect("snapshot attached to finish");
    assert_eq!(attached.records(&article).len(), 2);
    assert_eq!(attached.records(&page).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_failed_page_fetch_leaves_the_result_set_alone() {
    let transport = ScriptedTransport::new();
    transport.script("page=1", Reply::Json(PAGE_ONE));
    transport.script("page=2", Reply::Status(502, "bad gateway"));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());
    let article = SectionKey::from("article");

    aggregator.submit_search("cats");
    wait_until("page 1 to land", || log.results_seen() >= 1).await;
    aggregator.load_next_search_result_page();
    wait_until("page 2 to fail", || {
        log.snapshot().iter().any(|e| e.starts_with("fail"))
    })
    .await;

    assert_eq!(ids(&aggregator, "article"), vec!["1"]);
    assert_eq!(
        aggregator
            .snapshot()
            .section(&article)
            .map(|s| s.page),
        Some(1),
        "a failed fetch must not advance the page counter"
    );
    assert!(
        aggregator.has_more_pages_in_section(&article),
        "the section can still be retried"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn suggest_results_never_page() {
    let transport = ScriptedTransport::new();
    transport.script("suggest.json", Reply::Json(PAGE_ONE));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());

    aggregator.submit_query_text("cats");
    wait_until("suggest to finish", || log.results_seen() >= 1).await;

    aggregator.load_next_search_result_page();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.request_count(), 1);
    assert!(!aggregator.has_more_pages_in_section(&SectionKey::from("article")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_more_narrows_scope_first_then_pages_within_it() {
    let transport = ScriptedTransport::new();
    transport.script("page=1", Reply::Json(PAGE_ONE));
    transport.script("document_types=article", Reply::Json(PAGE_TWO));
    let mut config = two_section_config();
    config.scope_filtering = true;
    let (aggregator, log) = setup(Arc::clone(&transport), config);
    let article = SectionKey::from("article");

    aggregator.submit_search("cats");
    wait_until("page 1 to land", || log.results_seen() >= 1).await;

    // Two populated sections under "all": the first request narrows scope
    // rather than fetching.
    aggregator.request_more(&article);
    assert_eq!(aggregator.scope(), ScopeSelection::Section(article.clone()));
    assert_eq!(transport.request_count(), 1);

    // Narrowed now, so the same action pages the scoped section.
    aggregator.request_more(&article);
    wait_until("scoped page 2 to land", || log.results_seen() >= 2).await;

    assert_eq!(ids(&aggregator, "article"), vec!["1", "3"]);
    let scoped = &transport.requests()[1];
    assert!(scoped.contains("document_types=article"));
    assert!(scoped.contains("page=2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn superseded_search_is_cancelled_before_the_new_start() {
    let transport = ScriptedTransport::new();
    let _gate = transport.script_gated("q=first", Reply::Json(PAGE_ONE));
    transport.script("q=second", Reply::Json(PAGE_ONE));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());

    aggregator.submit_search("first");
    aggregator.submit_search("second");
    wait_until("second search to land", || log.results_seen() >= 1).await;

    let events = log.snapshot();
    assert_eq!(
        &events[..3],
        &[
            "start search first".to_string(),
            "cancel search first".to_string(),
            "start search second".to_string(),
        ]
    );
    assert_eq!(ids(&aggregator, "article"), vec!["1"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clicks_report_the_resolved_query() {
    let transport = ScriptedTransport::new();
    transport.script("page=1", Reply::Json(PAGE_ONE));
    transport.script("analytics/pc", Reply::Json("{}"));
    let (aggregator, log) = setup(Arc::clone(&transport), two_section_config());

    // Before any resolution there is nothing to report.
    aggregator.post_click_analytics("1");
    assert_eq!(transport.request_count(), 0);

    aggregator.submit_search("cats");
    wait_until("search to land", || log.results_seen() >= 1).await;
    aggregator.post_click_analytics("1");
    wait_until("analytics post to dispatch", || transport.request_count() >= 2).await;

    let click = &transport.requests()[1];
    assert!(click.contains("analytics/pc"));
    assert!(click.contains("q=cats"));
    assert!(click.contains("doc_id=1"));
}
