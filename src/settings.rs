//! Engine settings, exclude-pattern compilation, and search history.
//!
//! Settings are owned values: every operation clones one consistent snapshot
//! at its start and never re-reads mid-operation. Persistence goes through
//! the host's [`SettingsStore`] collaborator; the engine itself keeps no
//! durable state.

use std::collections::HashMap;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Settings-store keys used by the engine.
pub const SETTING_CASE_SENSITIVE: &str = "search.caseSensitive";
pub const SETTING_EXCLUDE_PATTERNS: &str = "search.excludePatterns";
pub const SETTING_EXCLUDE_ENABLED: &str = "search.excludeEnabled";
pub const SETTING_HISTORY: &str = "search.history";

/// Most-recent queries retained in the search history.
pub const HISTORY_LIMIT: usize = 20;

/// Host-persisted key-value settings store.
///
/// The host owns durability; the engine only reads at construction and
/// writes on explicit setting changes.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// In-memory settings store for hosts without persistence and for tests.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }
}

/// Engine-wide search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchState {
    pub case_sensitive: bool,
    pub exclude_patterns: Vec<String>,
    pub exclude_enabled: bool,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            exclude_patterns: Vec::new(),
            exclude_enabled: true,
        }
    }
}

impl SearchState {
    /// Loads persisted settings, falling back to defaults for missing or
    /// unparseable values.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        let case_sensitive = store
            .get(SETTING_CASE_SENSITIVE)
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.case_sensitive);
        let exclude_patterns = store
            .get(SETTING_EXCLUDE_PATTERNS)
            .and_then(|value| serde_json::from_str(&value).ok())
            .unwrap_or(defaults.exclude_patterns);
        let exclude_enabled = store
            .get(SETTING_EXCLUDE_ENABLED)
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.exclude_enabled);
        Self {
            case_sensitive,
            exclude_patterns,
            exclude_enabled,
        }
    }

    /// Persists the current values through the host store.
    pub fn save(&self, store: &dyn SettingsStore) {
        store.set(SETTING_CASE_SENSITIVE, &self.case_sensitive.to_string());
        if let Ok(json) = serde_json::to_string(&self.exclude_patterns) {
            store.set(SETTING_EXCLUDE_PATTERNS, &json);
        }
        store.set(SETTING_EXCLUDE_ENABLED, &self.exclude_enabled.to_string());
    }

    /// Compiles the exclude patterns, honoring the enabled flag.
    pub fn exclude_filter(&self) -> ExcludeFilter {
        if self.exclude_enabled {
            ExcludeFilter::compile(&self.exclude_patterns)
        } else {
            ExcludeFilter::default()
        }
    }
}

/// Compiled exclude patterns.
///
/// A pattern without glob metacharacters excludes any path containing it as
/// a case-insensitive substring. A pattern with metacharacters is compiled
/// as a case-insensitive glob with `*` confined to one path segment, and is
/// tested against the whole path and against each segment.
#[derive(Clone, Debug, Default)]
pub struct ExcludeFilter {
    literals: Vec<String>,
    globs: Vec<GlobMatcher>,
}

impl ExcludeFilter {
    pub fn compile(patterns: &[String]) -> Self {
        let mut literals = Vec::new();
        let mut globs = Vec::new();
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if pattern.contains(['*', '?', '[']) {
                match GlobBuilder::new(pattern)
                    .case_insensitive(true)
                    .literal_separator(true)
                    .build()
                {
                    Ok(glob) => globs.push(glob.compile_matcher()),
                    Err(error) => {
                        log::warn!("ignoring invalid exclude pattern {pattern:?}: {error}");
                    }
                }
            } else {
                literals.push(pattern.to_ascii_lowercase());
            }
        }
        Self { literals, globs }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.globs.is_empty()
    }

    /// Whether the given path is excluded by any pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }
        let text = path.to_string_lossy().to_ascii_lowercase();
        if self.literals.iter().any(|literal| text.contains(literal)) {
            return true;
        }
        self.globs.iter().any(|glob| {
            glob.is_match(path)
                || path
                    .components()
                    .any(|segment| glob.is_match(Path::new(segment.as_os_str())))
        })
    }
}

/// Bounded most-recent-first list of executed queries.
///
/// Entries are de-duplicated by exact text and capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHistory {
    entries: Vec<String>,
}

impl SearchHistory {
    pub fn load(store: &dyn SettingsStore) -> Self {
        store
            .get(SETTING_HISTORY)
            .and_then(|value| serde_json::from_str(&value).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn SettingsStore) {
        if let Ok(json) = serde_json::to_string(self) {
            store.set(SETTING_HISTORY, &json);
        }
    }

    /// Records an executed query at the front of the list.
    pub fn record(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.entries.retain(|entry| entry != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> ExcludeFilter {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        ExcludeFilter::compile(&patterns)
    }

    #[test]
    fn literal_pattern_matches_path_substring() {
        let filter = filter(&["node_modules"]);
        assert!(filter.is_excluded(Path::new("web/node_modules/react/index.js")));
        assert!(!filter.is_excluded(Path::new("src/modules/node.rs")));
    }

    #[test]
    fn literal_pattern_is_case_insensitive() {
        let filter = filter(&["Target"]);
        assert!(filter.is_excluded(Path::new("project/target/debug/build.rs")));
    }

    #[test]
    fn glob_star_stays_within_a_segment() {
        let filter = filter(&["*.min.js"]);
        assert!(filter.is_excluded(Path::new("dist/app.min.js")));
        assert!(!filter.is_excluded(Path::new("dist/app.min.ts")));
    }

    #[test]
    fn glob_matches_individual_segments() {
        let filter = filter(&["build*"]);
        assert!(filter.is_excluded(Path::new("out/build-cache/unit.log")));
        assert!(!filter.is_excluded(Path::new("out/src/unit.log")));
    }

    #[test]
    fn invalid_glob_is_ignored() {
        let filter = filter(&["[invalid", "node_modules"]);
        assert!(filter.is_excluded(Path::new("a/node_modules/b")));
        assert!(!filter.is_excluded(Path::new("a/src/b")));
    }

    #[test]
    fn empty_filter_excludes_nothing() {
        let filter = ExcludeFilter::default();
        assert!(!filter.is_excluded(Path::new("anything/at/all.txt")));
    }

    #[test]
    fn disabled_state_compiles_empty_filter() {
        let state = SearchState {
            exclude_patterns: vec!["node_modules".to_string()],
            exclude_enabled: false,
            ..SearchState::default()
        };
        assert!(state.exclude_filter().is_empty());
    }

    #[test]
    fn state_round_trips_through_store() {
        let store = MemorySettings::new();
        let state = SearchState {
            case_sensitive: true,
            exclude_patterns: vec!["dist".to_string(), "*.lock".to_string()],
            exclude_enabled: false,
        };
        state.save(&store);

        let loaded = SearchState::load(&store);
        assert!(loaded.case_sensitive);
        assert_eq!(loaded.exclude_patterns, state.exclude_patterns);
        assert!(!loaded.exclude_enabled);
    }

    #[test]
    fn missing_store_values_fall_back_to_defaults() {
        let store = MemorySettings::new();
        let loaded = SearchState::load(&store);
        assert!(!loaded.case_sensitive);
        assert!(loaded.exclude_patterns.is_empty());
        assert!(loaded.exclude_enabled);
    }

    #[test]
    fn history_is_most_recent_first_and_deduplicated() {
        let mut history = SearchHistory::default();
        history.record("alpha");
        history.record("beta");
        history.record("alpha");
        assert_eq!(history.entries(), ["alpha", "beta"]);
    }

    #[test]
    fn history_is_capped() {
        let mut history = SearchHistory::default();
        for i in 0..30 {
            history.record(&format!("query-{i}"));
        }
        assert_eq!(history.entries().len(), HISTORY_LIMIT);
        assert_eq!(history.entries()[0], "query-29");
        assert_eq!(history.entries()[HISTORY_LIMIT - 1], "query-10");
    }

    #[test]
    fn blank_history_entries_are_ignored() {
        let mut history = SearchHistory::default();
        history.record("   ");
        assert!(history.entries().is_empty());
    }

    #[test]
    fn history_round_trips_through_store() {
        let store = MemorySettings::new();
        let mut history = SearchHistory::default();
        history.record("first");
        history.record("second");
        history.save(&store);

        let loaded = SearchHistory::load(&store);
        assert_eq!(loaded.entries(), ["second", "first"]);
    }
}
