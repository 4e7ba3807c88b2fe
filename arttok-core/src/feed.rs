//! The feed engine: owns the ordered collection of loaded artworks, the
//! pagination cursor, and the loading/error state, and merges freshly
//! fetched pages under the dedup and termination rules.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::art::ArtPiece;
use crate::harvard::ArtCatalog;

/// Shown when a page fetch fails; a retry resumes from the same cursor.
pub const FETCH_ERROR_MESSAGE: &str =
    "Couldn't load artworks. Check your connection and try again.";
/// Shown when the catalog is exhausted before anything loaded.
pub const EMPTY_FEED_MESSAGE: &str = "No artworks available right now.";

/// Events emitted by the feed engine when its state changes.
#[derive(Clone, Debug)]
pub enum FeedEvent {
    /// Feed state changed (fetch started or completed, or the feed was reset).
    Changed,
}

/// Snapshot of the feed state handed to observers.
#[derive(Clone, Debug)]
pub struct FeedState {
    /// Loaded artworks in arrival order, unique by id.
    pub pieces: Vec<ArtPiece>,
    /// Next page number to request.
    pub cursor: u32,
    /// True only while a fetch is in flight.
    pub is_loading: bool,
    /// True until the first fetch attempt completes; distinguishes
    /// "nothing loaded yet" from "loaded and empty".
    pub is_initial_load: bool,
    /// True while the catalog may still yield unseen records.
    pub has_more: bool,
    /// User-facing message from the last failed or exhausted fetch.
    pub last_error: Option<String>,
    /// Bumped on every reset. A completion whose captured generation no
    /// longer matches is stale and must not touch state.
    generation: u64,
}

impl FeedState {
    fn new() -> Self {
        FeedState {
            pieces: Vec::new(),
            cursor: 1,
            is_loading: false,
            is_initial_load: true,
            has_more: true,
            last_error: None,
            generation: 0,
        }
    }
}

/// What a `fetch_next_page` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was applied; carries the number of new pieces appended.
    Fetched(usize),
    /// The call was dropped without a request: a fetch was already in
    /// flight, or the feed is exhausted.
    Skipped,
    /// The fetch completed after the feed was reset; nothing was applied.
    Stale,
    /// The fetch failed; `last_error` carries the user-facing message.
    Failed,
}

/// The feed engine. All mutation goes through `fetch_next_page` and `reset`;
/// observers read snapshots and subscribe to change events.
pub struct FeedEngine {
    catalog: Arc<dyn ArtCatalog>,
    page_size: u32,
    state: Mutex<FeedState>,
    event_tx: broadcast::Sender<FeedEvent>,
}

impl FeedEngine {
    pub fn new(catalog: Arc<dyn ArtCatalog>, page_size: u32) -> Self {
        let (event_tx, _) = broadcast::channel(16);
        FeedEngine {
            catalog,
            page_size,
            state: Mutex::new(FeedState::new()),
            event_tx,
        }
    }

    /// Subscribe to feed change events.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> FeedState {
        self.lock().clone()
    }

    /// Convenience: lock the feed state.
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap()
    }

    fn notify_changed(&self) {
        let _ = self.event_tx.send(FeedEvent::Changed);
    }

    /// Fetch the next page and merge it into the feed.
    ///
    /// Returns immediately without touching state when a fetch is already in
    /// flight, or when the feed is exhausted and already initialized.
    /// Failures never propagate: they land in `last_error` so the caller can
    /// re-invoke to retry from the same cursor.
    pub async fn fetch_next_page(&self) -> FetchOutcome {
        let (generation, page) = {
            let mut state = self.lock();
            if state.is_loading {
                debug!("fetch skipped: already loading");
                return FetchOutcome::Skipped;
            }
            // Refuse to page past an exhausted feed, but always allow the
            // very first call even if has_more was left stale.
            if !state.has_more && !state.is_initial_load {
                debug!("fetch skipped: feed exhausted");
                return FetchOutcome::Skipped;
            }
            state.is_loading = true;
            state.last_error = None;
            (state.generation, state.cursor)
        };
        self.notify_changed();

        let result = self.catalog.fetch_page(page, self.page_size).await;

        let outcome = {
            let mut state = self.lock();
            if state.generation != generation {
                // The feed was reset while this fetch was in flight; its
                // state has already been replaced.
                debug!("discarding stale completion for page {}", page);
                return FetchOutcome::Stale;
            }
            state.is_loading = false;
            state.is_initial_load = false;
            match result {
                Ok(fetched) => {
                    let mut seen: HashSet<i64> = state.pieces.iter().map(|p| p.id).collect();
                    let total = fetched.pieces.len();
                    let mut appended = 0usize;
                    for piece in fetched.pieces {
                        // Already-loaded ids are silently skipped.
                        if !seen.insert(piece.id) {
                            continue;
                        }
                        state.pieces.push(piece);
                        appended += 1;
                    }
                    if appended < total {
                        debug!("skipped {} duplicate piece(s)", total - appended);
                    }
                    state.cursor += 1;
                    // The server's pagination hint is unreliable for a
                    // randomized, deduplicated feed: keep going as long as a
                    // page still yields fresh pieces.
                    state.has_more = fetched.has_next || appended > 0;
                    if !state.has_more && state.pieces.is_empty() {
                        state.last_error = Some(EMPTY_FEED_MESSAGE.to_string());
                    }
                    info!(
                        "✓ page {} loaded: {} new piece(s), {} total",
                        page,
                        appended,
                        state.pieces.len()
                    );
                    FetchOutcome::Fetched(appended)
                }
                Err(e) => {
                    // Cursor and pieces stay untouched so a retry resumes here.
                    warn!("page {} fetch failed: {}", page, e);
                    state.last_error = Some(FETCH_ERROR_MESSAGE.to_string());
                    FetchOutcome::Failed
                }
            }
        };
        self.notify_changed();
        outcome
    }

    /// Clear the feed back to its initial state.
    ///
    /// Does not fetch; pull-to-refresh callers follow up with
    /// `fetch_next_page`. Any fetch still in flight becomes stale and its
    /// completion is discarded.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.pieces.clear();
            state.cursor = 1;
            state.is_loading = false;
            state.is_initial_load = true;
            state.has_more = true;
            state.last_error = None;
            state.generation += 1;
        }
        self.notify_changed();
    }
}
