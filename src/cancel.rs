//! Cancellation tokens for search and indexing operations.
//!
//! Two cooperating mechanisms:
//!
//! - [`SearchVersionTracker`] implements latest-wins request semantics: every
//!   logical search mints a new version, and tokens carrying an older version
//!   report as cancelled at their next checkpoint.
//! - [`CancelFlag`] is a plain abort handle for explicit cancellation (a
//!   caller abandoning a request, or engine disposal).
//!
//! Tokens are polled at defined checkpoints — batch, file, or line
//! boundaries — never mid-character.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A cloneable abort handle. Cancelling any clone cancels them all.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Tracks the active search version.
///
/// When a new search starts, call `next_version()` to get a new version
/// number. In-flight searches holding tokens for older versions are
/// cancelled the next time they check their token.
#[derive(Debug, Default)]
pub struct SearchVersionTracker {
    active_version: Arc<AtomicU64>,
}

impl SearchVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the active version and returns the new version number,
    /// superseding any in-flight searches with older versions.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the current active version without incrementing.
    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Creates a cancellation token for the given version. The token reports
    /// as cancelled once the active version has moved past `version`.
    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: Some((self.active_version.clone(), version)),
            flags: Vec::new(),
        }
    }
}

/// A cancellation token polled by long-running operations.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    /// Version pair `(active, minted)`; cancelled when they diverge.
    active_version: Option<(Arc<AtomicU64>, u64)>,
    /// Abort flags; cancelled when any is set.
    flags: Vec<CancelFlag>,
}

impl CancellationToken {
    /// Creates a token that is never cancelled. Useful for tests and for
    /// operations that should not be interruptible.
    pub fn noop() -> Self {
        Self {
            active_version: None,
            flags: Vec::new(),
        }
    }

    /// Adds an abort flag as an additional cancellation source.
    pub fn with_flag(mut self, flag: CancelFlag) -> Self {
        self.flags.push(flag);
        self
    }

    /// Checks whether this token is still active.
    ///
    /// Returns `Some(())` if still active, `None` if cancelled. This enables
    /// use with the `?` operator for early returns in `Option`-returning
    /// scan loops.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        if let Some((active, version)) = &self.active_version {
            if active.load(Ordering::Relaxed) != *version {
                return None;
            }
        }
        if self.flags.iter().any(CancelFlag::is_cancelled) {
            return None;
        }
        Some(())
    }
}

impl Default for CancellationToken {
    /// Default creates a noop token that is never cancelled.
    fn default() -> Self {
        Self::noop()
    }
}
