//! Literal substring matching over indexed content and single documents.
//!
//! Queries are matched verbatim — no regex metacharacter interpretation.
//! Case-insensitive comparisons ASCII-fold both query and haystack, which
//! keeps byte offsets identical between the folded and original text, so
//! reported columns always index into the original line.
//!
//! A query containing a line separator is matched against the file's full
//! buffer so occurrences spanning line boundaries are found; each hit is
//! reported at the line/column of its first character. Single-line queries
//! are matched per physical line, all non-overlapping occurrences, with the
//! scan advanced past each match.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use memchr::{memchr_iter, memmem};

use crate::cancel::CancellationToken;
use crate::settings::ExcludeFilter;
use crate::store::IndexedFile;
use crate::types::SearchMatch;

/// Queries shorter than this (after trimming) return no matches — a cheap
/// early exit, not an error.
pub const MIN_QUERY_LEN: usize = 2;

/// Indexed files scanned between cooperative yields.
const YIELD_EVERY_FILES: usize = 20;

/// A validated query with its substring finder built once.
pub(crate) struct PreparedQuery {
    needle: String,
    finder: memmem::Finder<'static>,
    case_sensitive: bool,
    multi_line: bool,
}

impl PreparedQuery {
    /// Returns `None` for blank queries and queries shorter than
    /// [`MIN_QUERY_LEN`]. The query text itself is matched verbatim,
    /// whitespace included.
    pub fn new(query: &str, case_sensitive: bool) -> Option<Self> {
        if query.trim().chars().count() < MIN_QUERY_LEN {
            return None;
        }
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_ascii_lowercase()
        };
        let finder = memmem::Finder::new(needle.as_bytes()).into_owned();
        Some(Self {
            multi_line: needle.contains('\n'),
            needle,
            finder,
            case_sensitive,
        })
    }
}

/// Scans indexed entries in enumeration order, skipping excluded paths.
///
/// Cancellation is checked once per file; control yields back to the
/// scheduler every [`YIELD_EVERY_FILES`] files. Returns `None` when
/// cancelled.
pub(crate) async fn search_indexed(
    entries: &[Arc<IndexedFile>],
    query: &PreparedQuery,
    filter: &ExcludeFilter,
    token: &CancellationToken,
) -> Option<Vec<SearchMatch>> {
    let mut matches = Vec::new();
    for (scanned, entry) in entries.iter().enumerate() {
        token.is_cancelled()?;
        if !filter.is_excluded(&entry.path) {
            scan_file(&entry.path, &entry.content, query, &mut matches);
        }
        if (scanned + 1) % YIELD_EVERY_FILES == 0 {
            tokio::task::yield_now().await;
        }
    }
    Some(matches)
}

/// Scans one document, checking cancellation per physical line.
/// Returns `None` when cancelled.
pub(crate) fn search_document(
    path: &Path,
    text: &str,
    query: &PreparedQuery,
    token: &CancellationToken,
) -> Option<Vec<SearchMatch>> {
    let mut matches = Vec::new();
    if query.multi_line {
        token.is_cancelled()?;
        scan_buffer(path, text, query, &mut matches);
        return Some(matches);
    }

    let haystack = fold(text, query.case_sensitive);
    let starts = line_starts(text);
    for line_index in 0..starts.len() {
        token.is_cancelled()?;
        scan_line(path, text, &haystack, &starts, line_index, query, &mut matches);
    }
    Some(matches)
}

fn scan_file(path: &Path, content: &str, query: &PreparedQuery, out: &mut Vec<SearchMatch>) {
    if query.multi_line {
        scan_buffer(path, content, query, out);
        return;
    }
    let haystack = fold(content, query.case_sensitive);
    let starts = line_starts(content);
    for line_index in 0..starts.len() {
        scan_line(path, content, &haystack, &starts, line_index, query, out);
    }
}

/// Matches a multi-line query against the whole buffer and maps each hit
/// back to the line/column of its first character.
fn scan_buffer(path: &Path, content: &str, query: &PreparedQuery, out: &mut Vec<SearchMatch>) {
    let haystack = fold(content, query.case_sensitive);
    let starts = line_starts(content);
    for offset in query.finder.find_iter(haystack.as_bytes()) {
        let line_index = match starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let (line_start, line_end) = line_span(content, &starts, line_index);
        let match_end = (offset + query.needle.len()).min(line_end);
        out.push(SearchMatch {
            path: path.to_path_buf(),
            line: (line_index + 1) as u32,
            column_start: (offset - line_start) as u32,
            column_end: (match_end.saturating_sub(line_start)) as u32,
            line_text: content[line_start..line_end].to_string(),
        });
    }
}

/// Matches a single-line query against one physical line, reporting every
/// non-overlapping occurrence.
fn scan_line(
    path: &Path,
    content: &str,
    haystack: &str,
    starts: &[usize],
    line_index: usize,
    query: &PreparedQuery,
    out: &mut Vec<SearchMatch>,
) {
    let (line_start, line_end) = line_span(content, starts, line_index);
    if line_end - line_start < query.needle.len() {
        return;
    }
    let line_haystack = &haystack.as_bytes()[line_start..line_end];
    for offset in query.finder.find_iter(line_haystack) {
        out.push(SearchMatch {
            path: path.to_path_buf(),
            line: (line_index + 1) as u32,
            column_start: offset as u32,
            column_end: (offset + query.needle.len()) as u32,
            line_text: content[line_start..line_end].to_string(),
        });
    }
}

/// ASCII-folds the haystack for case-insensitive scans. Folding preserves
/// byte length, so offsets into the folded text index the original too.
fn fold(content: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(content)
    } else {
        Cow::Owned(content.to_ascii_lowercase())
    }
}

/// Byte offsets at which each physical line starts.
fn line_starts(content: &str) -> Vec<usize> {
    let mut starts = Vec::with_capacity(64);
    starts.push(0);
    starts.extend(memchr_iter(b'\n', content.as_bytes()).map(|offset| offset + 1));
    starts
}

/// Span of one physical line, excluding its terminator (`\n` or `\r\n`).
fn line_span(content: &str, starts: &[usize], line_index: usize) -> (usize, usize) {
    let start = starts[line_index];
    let mut end = match starts.get(line_index + 1) {
        Some(next_start) => next_start - 1,
        None => content.len(),
    };
    if end > start && content.as_bytes()[end - 1] == b'\r' {
        end -= 1;
    }
    (start, end)
}
