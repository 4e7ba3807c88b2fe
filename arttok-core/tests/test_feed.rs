//! Feed engine behavior tests against in-memory catalogs.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::timeout;

use arttok_core::art::ArtPiece;
use arttok_core::feed::{
    FeedEngine, FeedEvent, FetchOutcome, EMPTY_FEED_MESSAGE, FETCH_ERROR_MESSAGE,
};
use arttok_core::harvard::{ArtCatalog, ArtPage, HarvardError};

fn piece(id: i64) -> ArtPiece {
    ArtPiece {
        id,
        image_url: format!("https://example.org/{id}.jpg"),
        title: format!("Piece {id}"),
        artist: "Unknown artist".to_string(),
        description: None,
        culture: None,
        dated: None,
        classification: None,
        medium: None,
        dimensions: None,
        url: None,
    }
}

fn page(ids: &[i64], has_next: bool) -> ArtPage {
    ArtPage {
        pieces: ids.iter().map(|&id| piece(id)).collect(),
        has_next,
    }
}

fn transport_error() -> HarvardError {
    HarvardError::Api {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".to_string(),
    }
}

/// Catalog that replays a scripted sequence of results and records calls.
struct ScriptedCatalog {
    results: Mutex<VecDeque<Result<ArtPage, HarvardError>>>,
    calls: Mutex<Vec<(u32, u32)>>,
}

impl ScriptedCatalog {
    fn new(results: Vec<Result<ArtPage, HarvardError>>) -> Arc<Self> {
        Arc::new(ScriptedCatalog {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(u32, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtCatalog for ScriptedCatalog {
    async fn fetch_page(&self, page: u32, size: u32) -> Result<ArtPage, HarvardError> {
        self.calls.lock().unwrap().push((page, size));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .expect("catalog called more times than scripted")
    }
}

/// Catalog whose single fetch blocks until released, for in-flight tests.
struct GatedCatalog {
    started: Notify,
    release: Notify,
    result: Mutex<Option<Result<ArtPage, HarvardError>>>,
}

impl GatedCatalog {
    fn new(result: Result<ArtPage, HarvardError>) -> Arc<Self> {
        Arc::new(GatedCatalog {
            started: Notify::new(),
            release: Notify::new(),
            result: Mutex::new(Some(result)),
        })
    }
}

#[async_trait]
impl ArtCatalog for GatedCatalog {
    async fn fetch_page(&self, _page: u32, _size: u32) -> Result<ArtPage, HarvardError> {
        self.started.notify_one();
        self.release.notified().await;
        self.result
            .lock()
            .unwrap()
            .take()
            .expect("gated catalog fetched twice")
    }
}

// ---- First load ----

#[tokio::test]
async fn first_page_loads_and_keeps_paging() {
    let catalog = ScriptedCatalog::new(vec![Ok(page(&[1, 2, 3, 4, 5, 6, 7, 8], true))]);
    let engine = FeedEngine::new(catalog.clone(), 8);

    let before = engine.snapshot();
    assert!(before.is_initial_load);
    assert!(before.has_more);
    assert_eq!(before.cursor, 1);

    let outcome = engine.fetch_next_page().await;
    assert_eq!(outcome, FetchOutcome::Fetched(8));

    let state = engine.snapshot();
    assert_eq!(state.pieces.len(), 8);
    assert!(state.has_more);
    assert!(!state.is_initial_load);
    assert!(!state.is_loading);
    assert!(state.last_error.is_none());
    assert_eq!(state.cursor, 2);
    assert_eq!(catalog.calls(), vec![(1, 8)]);
}

// ---- Dedup invariant ----

#[tokio::test]
async fn overlapping_pages_never_duplicate_ids() {
    let catalog = ScriptedCatalog::new(vec![
        Ok(page(&[1, 2, 3, 4], true)),
        Ok(page(&[3, 4, 5, 6], true)),
        Ok(page(&[6, 6, 7], true)),
    ]);
    let engine = FeedEngine::new(catalog, 4);

    engine.fetch_next_page().await;
    engine.fetch_next_page().await;
    let outcome = engine.fetch_next_page().await;
    assert_eq!(outcome, FetchOutcome::Fetched(1));

    let state = engine.snapshot();
    let ids: Vec<i64> = state.pieces.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(state.cursor, 4);
}

// ---- Single fetch in flight ----

#[tokio::test]
async fn fetch_while_loading_is_dropped() {
    let catalog = GatedCatalog::new(Ok(page(&[1], true)));
    let engine = Arc::new(FeedEngine::new(catalog.clone(), 8));

    let task = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_next_page().await }
    });
    timeout(Duration::from_secs(5), catalog.started.notified())
        .await
        .expect("fetch never started");

    assert!(engine.snapshot().is_loading);
    assert_eq!(engine.fetch_next_page().await, FetchOutcome::Skipped);

    catalog.release.notify_one();
    let outcome = timeout(Duration::from_secs(5), task)
        .await
        .expect("fetch never finished")
        .expect("fetch task panicked");
    assert_eq!(outcome, FetchOutcome::Fetched(1));
    assert_eq!(engine.snapshot().pieces.len(), 1);
}

// ---- Transport failure is retryable state, not an error ----

#[tokio::test]
async fn transport_failure_sets_retryable_error_and_keeps_cursor() {
    let catalog = ScriptedCatalog::new(vec![
        Ok(page(&[1, 2], true)),
        Err(transport_error()),
        Ok(page(&[3], true)),
    ]);
    let engine = FeedEngine::new(catalog.clone(), 8);

    engine.fetch_next_page().await;
    let outcome = engine.fetch_next_page().await;
    assert_eq!(outcome, FetchOutcome::Failed);

    let state = engine.snapshot();
    assert_eq!(state.last_error.as_deref(), Some(FETCH_ERROR_MESSAGE));
    assert_eq!(state.pieces.len(), 2);
    assert_eq!(state.cursor, 2);
    assert!(!state.is_loading);
    assert!(!state.is_initial_load);
    assert!(state.has_more);

    // Retry resumes at the failed cursor and clears the error.
    let outcome = engine.fetch_next_page().await;
    assert_eq!(outcome, FetchOutcome::Fetched(1));
    assert!(engine.snapshot().last_error.is_none());
    assert_eq!(catalog.calls(), vec![(1, 8), (2, 8), (2, 8)]);
}

// ---- Exhaustion ----

#[tokio::test]
async fn exhausted_empty_feed_reports_nothing_to_show() {
    let catalog = ScriptedCatalog::new(vec![Ok(page(&[], false))]);
    let engine = FeedEngine::new(catalog.clone(), 8);

    assert_eq!(engine.fetch_next_page().await, FetchOutcome::Fetched(0));
    let state = engine.snapshot();
    assert!(!state.has_more);
    assert_eq!(state.last_error.as_deref(), Some(EMPTY_FEED_MESSAGE));

    // Exhausted and initialized: further calls never hit the catalog.
    assert_eq!(engine.fetch_next_page().await, FetchOutcome::Skipped);
    assert_eq!(catalog.calls().len(), 1);
}

#[tokio::test]
async fn has_more_terminates_once_page_is_all_duplicates_and_no_next() {
    let catalog = ScriptedCatalog::new(vec![Ok(page(&[1, 2], true)), Ok(page(&[1, 2], false))]);
    let engine = FeedEngine::new(catalog, 2);

    engine.fetch_next_page().await;
    engine.fetch_next_page().await;

    let state = engine.snapshot();
    assert!(!state.has_more);
    // Loaded-but-exhausted is not an error state.
    assert!(state.last_error.is_none());
    assert_eq!(state.pieces.len(), 2);
}

#[tokio::test]
async fn fresh_pieces_keep_feed_alive_despite_server_saying_done() {
    let catalog = ScriptedCatalog::new(vec![Ok(page(&[1, 2], false)), Ok(page(&[3], false))]);
    let engine = FeedEngine::new(catalog, 2);

    engine.fetch_next_page().await;
    assert!(engine.snapshot().has_more);

    engine.fetch_next_page().await;
    assert!(engine.snapshot().has_more);
}

// ---- Reset ----

#[tokio::test]
async fn reset_reproduces_a_clean_first_load() {
    let catalog = ScriptedCatalog::new(vec![
        Ok(page(&[], false)),
        Ok(page(&[1, 2, 3, 4, 5, 6, 7, 8], true)),
    ]);
    let engine = FeedEngine::new(catalog, 8);

    engine.fetch_next_page().await;
    assert!(!engine.snapshot().has_more);

    engine.reset();
    let state = engine.snapshot();
    assert!(state.pieces.is_empty());
    assert_eq!(state.cursor, 1);
    assert!(state.is_initial_load);
    assert!(state.has_more);
    assert!(state.last_error.is_none());

    let outcome = engine.fetch_next_page().await;
    assert_eq!(outcome, FetchOutcome::Fetched(8));
    let state = engine.snapshot();
    assert_eq!(state.pieces.len(), 8);
    assert!(state.has_more);
    assert!(!state.is_initial_load);
}

#[tokio::test]
async fn reset_discards_inflight_completion() {
    let catalog = GatedCatalog::new(Ok(page(&[1, 2, 3], true)));
    let engine = Arc::new(FeedEngine::new(catalog.clone(), 8));

    let task = tokio::spawn({
        let engine = engine.clone();
        async move { engine.fetch_next_page().await }
    });
    timeout(Duration::from_secs(5), catalog.started.notified())
        .await
        .expect("fetch never started");

    engine.reset();
    catalog.release.notify_one();
    let outcome = timeout(Duration::from_secs(5), task)
        .await
        .expect("fetch never finished")
        .expect("fetch task panicked");
    assert_eq!(outcome, FetchOutcome::Stale);

    // The stale completion must not resurrect pre-reset state.
    let state = engine.snapshot();
    assert!(state.pieces.is_empty());
    assert_eq!(state.cursor, 1);
    assert!(state.is_initial_load);
    assert!(!state.is_loading);
}

// ---- Change events ----

#[tokio::test]
async fn state_changes_notify_subscribers() {
    let catalog = ScriptedCatalog::new(vec![Ok(page(&[1], true))]);
    let engine = FeedEngine::new(catalog, 8);
    let mut rx = engine.subscribe();

    engine.fetch_next_page().await;

    // One event for the fetch start, one for the completion.
    for _ in 0..2 {
        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no feed event")
            .expect("feed channel closed");
        assert!(matches!(event, FeedEvent::Changed));
    }

    engine.reset();
    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no reset event")
        .expect("feed channel closed");
    assert!(matches!(event, FeedEvent::Changed));
}
