//! The public search facade: request coordination, settings, lifecycle.
//!
//! `SearchManager` serializes logical search requests with latest-wins
//! semantics: every call mints a new request version, superseding any
//! in-flight search from the same manager. A superseded search observes its
//! token at the next checkpoint and resolves `Cancelled`; its results are
//! never delivered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::cancel::{CancelFlag, CancellationToken, SearchVersionTracker};
use crate::error::{Result, SearchError};
use crate::indexer::{IndexState, Indexer};
use crate::search::engine::{self, PreparedQuery};
use crate::settings::{SearchHistory, SearchState, SettingsStore};
use crate::store::IndexStore;
use crate::sweep::spawn_sweeper;
use crate::types::{ProgressHandler, SearchOptions, SearchResults};
use crate::workspace::WorkspaceFiles;

/// One search engine instance, owned by its caller.
///
/// Construction spawns the eviction sweep task, so the manager must be
/// created inside a tokio runtime. Multiplicity is the application's
/// concern; the engine enforces nothing beyond its own request ordering.
pub struct SearchManager {
    store: Arc<IndexStore>,
    indexer: Arc<Indexer>,
    settings_store: Arc<dyn SettingsStore>,
    state: Mutex<SearchState>,
    history: Mutex<SearchHistory>,
    tracker: SearchVersionTracker,
    /// Set on disposal; cancels all outstanding work.
    halt: CancelFlag,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl SearchManager {
    pub fn new(
        workspace: Arc<dyn WorkspaceFiles>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> Self {
        let store = Arc::new(IndexStore::new());
        let state = SearchState::load(settings_store.as_ref());
        let history = SearchHistory::load(settings_store.as_ref());
        let halt = CancelFlag::new();
        let indexer = Arc::new(Indexer::new(store.clone(), workspace, halt.clone()));
        let sweeper = spawn_sweeper(store.clone());
        log::info!(
            "search engine created case_sensitive={} exclude_patterns={} exclude_enabled={}",
            state.case_sensitive,
            state.exclude_patterns.len(),
            state.exclude_enabled,
        );
        Self {
            store,
            indexer,
            settings_store,
            state: Mutex::new(state),
            history: Mutex::new(history),
            tracker: SearchVersionTracker::new(),
            halt,
            sweeper: Mutex::new(Some(sweeper)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Registers the single progress handler, invoked during indexing passes
    /// only. Replaces any previously registered handler.
    pub fn on_progress(&self, handler: ProgressHandler) {
        self.indexer.set_progress_handler(handler);
    }

    /// Completes once an indexing pass has finished at least once; builds
    /// the index on first use.
    pub async fn wait_for_ready(&self) -> Result<()> {
        self.ensure_live()?;
        let token = CancellationToken::noop().with_flag(self.halt.clone());
        let filter = self.state.lock().exclude_filter();
        self.indexer.wait_for_ready(&token, filter).await
    }

    /// Runs one logical search request.
    ///
    /// The newest call wins: any search still in flight from this manager is
    /// cancelled, and only the newest request's results are ever delivered.
    /// `cancel` lets the caller abort this request explicitly.
    pub async fn search(
        &self,
        query: &str,
        cancel: &CancelFlag,
        options: SearchOptions,
    ) -> Result<SearchResults> {
        self.ensure_live()?;
        let request_id = self.tracker.next_version();
        let token = self
            .tracker
            .token_for_version(request_id)
            .with_flag(self.halt.clone())
            .with_flag(cancel.clone());

        // One consistent settings snapshot per request.
        let mut state = self.state.lock().clone();
        if let Some(case_sensitive) = options.case_sensitive {
            state.case_sensitive = case_sensitive;
        }
        if let Some(patterns) = options.exclude_patterns {
            state.exclude_patterns = patterns;
            state.exclude_enabled = true;
        }

        // Blank and sub-minimum queries resolve empty without touching the
        // index at all.
        let Some(prepared) = PreparedQuery::new(query, state.case_sensitive) else {
            return Ok(SearchResults {
                request_id,
                matches: Vec::new(),
            });
        };

        let matches = match options.document {
            Some(document) => {
                let text = document.text().map_err(|source| SearchError::DocumentRead {
                    path: document.path().to_path_buf(),
                    source,
                })?;
                engine::search_document(document.path(), &text, &prepared, &token)
                    .ok_or(SearchError::Cancelled)?
            }
            None => {
                let filter = state.exclude_filter();
                self.indexer.wait_for_ready(&token, filter.clone()).await?;
                if token.is_cancelled().is_none() {
                    return Err(SearchError::Cancelled);
                }
                let entries = self.store.snapshot();
                engine::search_indexed(&entries, &prepared, &filter, &token)
                    .await
                    .ok_or(SearchError::Cancelled)?
            }
        };

        // Delivery-time check: results for a superseded request are
        // discarded, never delivered.
        if token.is_cancelled().is_none() {
            return Err(SearchError::Cancelled);
        }

        self.record_history(query);
        log::debug!(
            "search delivered request_id={} matches={}",
            request_id,
            matches.len(),
        );
        Ok(SearchResults {
            request_id,
            matches,
        })
    }

    pub fn case_sensitive(&self) -> bool {
        self.state.lock().case_sensitive
    }

    /// Changing a setting never triggers a re-search; re-querying is the
    /// caller's responsibility.
    pub fn set_case_sensitive(&self, value: bool) {
        let mut state = self.state.lock();
        state.case_sensitive = value;
        state.save(self.settings_store.as_ref());
    }

    pub fn exclude_patterns(&self) -> (Vec<String>, bool) {
        let state = self.state.lock();
        (state.exclude_patterns.clone(), state.exclude_enabled)
    }

    pub fn set_exclude_patterns(&self, patterns: Vec<String>, enabled: bool) {
        let mut state = self.state.lock();
        state.exclude_patterns = patterns;
        state.exclude_enabled = enabled;
        state.save(self.settings_store.as_ref());
    }

    /// Most-recent-first executed queries, capped and de-duplicated.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().entries().to_vec()
    }

    pub fn index_len(&self) -> usize {
        self.store.len()
    }

    pub fn is_ready(&self) -> bool {
        self.indexer.state() == IndexState::Ready
    }

    /// Discards the current index and runs a fresh pass, cancelling any pass
    /// already in flight.
    pub async fn rebuild(&self) -> Result<()> {
        self.ensure_live()?;
        self.indexer.cancel_pass();
        self.indexer.reset_ready();
        self.store.clear();

        let token = CancellationToken::noop().with_flag(self.halt.clone());
        loop {
            if self.halt.is_cancelled() {
                return Err(SearchError::Disposed);
            }
            let filter = self.state.lock().exclude_filter();
            match self.indexer.wait_for_ready(&token, filter).await {
                Ok(()) => return Ok(()),
                // The pass we cancelled won the start race; go again.
                Err(SearchError::Cancelled) => continue,
                Err(error) => return Err(error),
            }
        }
    }

    /// Cancels outstanding work, stops the sweep task, and releases all
    /// indexed content. Idempotent; the engine is unusable afterwards.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.halt.cancel();
        self.indexer.cancel_pass();
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.abort();
        }
        self.store.clear();
        log::info!("search engine disposed");
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SearchError::Disposed);
        }
        Ok(())
    }

    fn record_history(&self, query: &str) {
        let mut history = self.history.lock();
        history.record(query);
        history.save(self.settings_store.as_ref());
    }
}

impl Drop for SearchManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
