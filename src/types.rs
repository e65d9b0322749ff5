//! Result and option types exposed to the embedding host.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::workspace::DocumentText;

/// One occurrence of the query in an indexed file or supplied document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// File the match was found in.
    pub path: PathBuf,
    /// 1-based physical line of the first matched character.
    pub line: u32,
    /// Byte offset of the match start within the line.
    pub column_start: u32,
    /// Byte offset one past the match end within the line, clamped to the
    /// line end for matches that span line boundaries.
    pub column_end: u32,
    /// The full physical line containing the match start, original casing,
    /// without the trailing line terminator.
    pub line_text: String,
}

/// A delivered result set, tagged with the request id that produced it.
///
/// Matches appear in file enumeration order, and within a file in ascending
/// line/column order. Results for superseded request ids are never delivered.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub request_id: u64,
    pub matches: Vec<SearchMatch>,
}

/// Per-request options. Unset fields fall back to the engine settings.
#[derive(Clone, Default)]
pub struct SearchOptions {
    /// Overrides the engine's case-sensitivity setting for this request.
    pub case_sensitive: Option<bool>,
    /// Overrides (and enables) the exclude patterns for this request.
    pub exclude_patterns: Option<Vec<String>>,
    /// Restricts the search to one open document, bypassing the index.
    pub document: Option<Arc<dyn DocumentText>>,
}

impl std::fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOptions")
            .field("case_sensitive", &self.case_sensitive)
            .field("exclude_patterns", &self.exclude_patterns)
            .field("document", &self.document.as_ref().map(|d| d.path()))
            .finish()
    }
}

/// The single progress handler registered per engine instance.
///
/// Invoked during indexing passes only, with a human-readable message and,
/// when known, a completion percentage in `[0, 100]`.
pub type ProgressHandler = Box<dyn Fn(&str, Option<f32>) + Send + Sync>;
