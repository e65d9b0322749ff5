//! In-process incremental text search over a workspace of files.
//!
//! This crate provides the search core an embedding application drives:
//! - Bounded in-memory index of file contents, built in cooperative batches
//! - Literal substring queries, single- and multi-line, case-foldable
//! - Latest-wins request coordination with cooperative cancellation
//! - Periodic eviction keeping long-run memory bounded
//! - Current-file-only scope scanning one supplied document
//!
//! The host supplies file enumeration, document access, and settings
//! persistence through the traits in [`workspace`] and [`settings`].

pub mod cancel;
pub mod error;
pub mod indexer;
pub mod search;
pub mod settings;
pub mod store;
pub mod sweep;
pub mod types;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types
pub use cancel::{CancelFlag, CancellationToken, SearchVersionTracker};
pub use error::{Result, SearchError};
pub use indexer::IndexState;
pub use search::SearchManager;
pub use settings::{MemorySettings, SearchHistory, SearchState, SettingsStore};
pub use store::{IndexStore, IndexedFile};
pub use types::{ProgressHandler, SearchMatch, SearchOptions, SearchResults};
pub use workspace::{DocumentText, FsDocument, FsWorkspace, WorkspaceFiles};
