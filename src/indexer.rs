//! Workspace indexing: batched, cancellable population of the index store.
//!
//! Exactly one indexing pass runs at a time. The pass processes candidates
//! in fixed-size batches and yields back to the scheduler between batches so
//! a large tree never starves the host. Per-file faults are recovered
//! locally; only a failure to list the workspace fails the pass.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::cancel::{CancelFlag, CancellationToken};
use crate::error::{Result, SearchError};
use crate::settings::ExcludeFilter;
use crate::store::{IndexStore, IndexedFile, MAX_INDEXED_FILES};
use crate::types::ProgressHandler;
use crate::workspace::WorkspaceFiles;

/// Files processed between cooperative yields and cancellation checks.
pub const INDEX_BATCH_SIZE: usize = 20;

/// Largest file admitted to the index, in bytes. Checked against the
/// reported size before the file is read.
pub const MAX_FILE_SIZE: u64 = 512 * 1024;

/// Leading bytes sniffed for NUL to skip binary content.
const BINARY_SNIFF_BYTES: usize = 1024;

/// How often a waiter polls its own cancellation while an in-flight pass
/// makes progress.
const WAIT_POLL: std::time::Duration = std::time::Duration::from_millis(50);

/// Index readiness, broadcast to `wait_for_ready` callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No pass has completed; none is running.
    Idle,
    /// A pass is in flight.
    Building,
    /// A pass has completed; the index is queryable. Content is not
    /// invalidated by later disk changes until rebuild or eviction.
    Ready,
}

enum PassOutcome {
    Complete { indexed: usize },
    Cancelled,
    Failed(String),
}

/// Serialized index-pass driver shared by the manager and the pass task.
pub struct Indexer {
    store: Arc<IndexStore>,
    workspace: Arc<dyn WorkspaceFiles>,
    /// Engine-wide halt flag, set on disposal.
    halt: CancelFlag,
    state_tx: watch::Sender<IndexState>,
    /// Abort flag for the in-flight pass, if any.
    pass_abort: Mutex<Option<CancelFlag>>,
    /// Failure message from the last pass that did not reach `Ready`.
    last_error: Mutex<Option<String>>,
    progress: Mutex<Option<ProgressHandler>>,
}

impl Indexer {
    pub fn new(
        store: Arc<IndexStore>,
        workspace: Arc<dyn WorkspaceFiles>,
        halt: CancelFlag,
    ) -> Self {
        let (state_tx, _) = watch::channel(IndexState::Idle);
        Self {
            store,
            workspace,
            halt,
            state_tx,
            pass_abort: Mutex::new(None),
            last_error: Mutex::new(None),
            progress: Mutex::new(None),
        }
    }

    pub fn state(&self) -> IndexState {
        *self.state_tx.borrow()
    }

    /// Registers the single progress handler, replacing any previous one.
    /// The handler is invoked during indexing passes only.
    pub fn set_progress_handler(&self, handler: ProgressHandler) {
        *self.progress.lock() = Some(handler);
    }

    /// Cancels the in-flight pass, if any. The partial index remains valid.
    pub fn cancel_pass(&self) {
        if let Some(abort) = self.pass_abort.lock().as_ref() {
            abort.cancel();
        }
    }

    /// Parks a `Ready` index back at `Idle` so the next waiter starts a
    /// fresh pass.
    pub fn reset_ready(&self) {
        self.state_tx.send_if_modified(|state| {
            if *state == IndexState::Ready {
                *state = IndexState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Completes once an indexing pass has finished at least once.
    ///
    /// Starts a pass when idle; joins the in-flight pass when building (all
    /// concurrent waiters resolve together); returns immediately when ready.
    /// `waiter` cancels only this wait, never the shared pass itself.
    pub async fn wait_for_ready(
        self: &Arc<Self>,
        waiter: &CancellationToken,
        filter: ExcludeFilter,
    ) -> Result<()> {
        let mut rx = self.state_tx.subscribe();
        let mut started = false;
        loop {
            if waiter.is_cancelled().is_none() {
                return Err(SearchError::Cancelled);
            }
            // Copy the state out so no channel lock is held while acting on it.
            let state = *rx.borrow_and_update();
            match state {
                IndexState::Ready => return Ok(()),
                IndexState::Idle if !started => {
                    self.start_pass(filter.clone());
                    started = true;
                    continue;
                }
                // The pass this waiter joined ended without reaching Ready.
                IndexState::Idle => {
                    return Err(match self.last_error.lock().clone() {
                        Some(message) => SearchError::Indexing(message),
                        None => SearchError::Cancelled,
                    });
                }
                IndexState::Building => {
                    started = true;
                }
            }

            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(SearchError::Disposed);
                    }
                }
                _ = tokio::time::sleep(WAIT_POLL) => {}
            }
        }
    }

    /// Starts a pass if the index is idle. No-op when one is already in
    /// flight or the index is ready.
    fn start_pass(self: &Arc<Self>, filter: ExcludeFilter) {
        let should_start = self.state_tx.send_if_modified(|state| {
            if *state == IndexState::Idle {
                *state = IndexState::Building;
                true
            } else {
                false
            }
        });
        if !should_start {
            return;
        }

        *self.last_error.lock() = None;
        let abort = CancelFlag::new();
        {
            let mut slot = self.pass_abort.lock();
            // A previous pass may still be winding down; make sure it stops.
            if let Some(previous) = slot.take() {
                previous.cancel();
            }
            *slot = Some(abort.clone());
        }
        let token = CancellationToken::noop()
            .with_flag(self.halt.clone())
            .with_flag(abort);

        let indexer = self.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = indexer.run_pass(&filter, &token).await;
            let next_state = match outcome {
                PassOutcome::Complete { indexed } => {
                    log::info!(
                        "index pass complete files={} store={} elapsed_ms={}",
                        indexed,
                        indexer.store.len(),
                        started.elapsed().as_millis(),
                    );
                    IndexState::Ready
                }
                PassOutcome::Cancelled => {
                    log::debug!(
                        "index pass cancelled store={} elapsed_ms={}",
                        indexer.store.len(),
                        started.elapsed().as_millis(),
                    );
                    IndexState::Idle
                }
                PassOutcome::Failed(message) => {
                    log::warn!("index pass failed: {message}");
                    *indexer.last_error.lock() = Some(message);
                    IndexState::Idle
                }
            };
            indexer.pass_abort.lock().take();
            // send_replace: the transition must land even with no waiters
            // subscribed at this moment.
            indexer.state_tx.send_replace(next_state);
        });
    }

    /// One pass over the workspace candidates.
    ///
    /// Cancellation is checked at the start of every batch; a cancelled pass
    /// leaves the entries admitted so far in place, valid and queryable.
    async fn run_pass(&self, filter: &ExcludeFilter, token: &CancellationToken) -> PassOutcome {
        let candidates = match self.workspace.list_files() {
            Ok(candidates) => candidates,
            Err(error) => {
                return PassOutcome::Failed(format!("workspace listing failed: {error}"));
            }
        };
        // The denominator is fixed at scan start; files discovered later are
        // picked up by the next pass.
        let total = candidates.len();
        let mut processed = 0usize;
        let mut indexed = 0usize;

        for batch in candidates.chunks(INDEX_BATCH_SIZE) {
            if token.is_cancelled().is_none() {
                return PassOutcome::Cancelled;
            }

            for path in batch {
                processed += 1;
                if filter.is_excluded(path) {
                    continue;
                }
                // At capacity: keep scanning so progress stays accurate, but
                // admit no new files. Existing entries may still refresh.
                if self.store.len() >= MAX_INDEXED_FILES && self.store.get(path).is_none() {
                    continue;
                }
                let size = match self.workspace.file_size(path) {
                    Ok(size) => size,
                    Err(error) => {
                        log::debug!("skipping {}: {error}", path.display());
                        continue;
                    }
                };
                if size > MAX_FILE_SIZE {
                    continue;
                }
                let content = match self.workspace.read_file(path) {
                    Ok(content) => content,
                    Err(error) => {
                        log::debug!("skipping {}: {error}", path.display());
                        continue;
                    }
                };
                if content.len() as u64 > MAX_FILE_SIZE || looks_binary(&content) {
                    continue;
                }
                if self.store.put(IndexedFile::new(path.clone(), content)) {
                    indexed += 1;
                }
            }

            let percent = if total == 0 {
                100.0
            } else {
                (processed as f32 / total as f32 * 100.0).clamp(0.0, 100.0)
            };
            self.emit_progress(
                &format!("Indexing workspace files ({processed}/{total})"),
                Some(percent),
            );

            tokio::task::yield_now().await;
        }

        PassOutcome::Complete { indexed }
    }

    fn emit_progress(&self, message: &str, percent: Option<f32>) {
        if let Some(handler) = self.progress.lock().as_ref() {
            handler(message, percent);
        }
    }
}

fn looks_binary(content: &str) -> bool {
    content
        .as_bytes()
        .iter()
        .take(BINARY_SNIFF_BYTES)
        .any(|&byte| byte == 0)
}
