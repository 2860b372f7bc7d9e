use crate::services::search::{FileMatches, SearchQuery};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use std::fmt;

/// An operation the user can trigger against the scripts directory.
///
/// Only one operation may run at a time; see
/// [`StateManager::begin_operation`](crate::state::StateManager::begin_operation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Prepare,
    ResetPermanently,
    ResetTemporarily,
    RestoreModifications,
    GeneratePatches,
    UpdateGlobal,
    UpdateSdat,
    Search,
}

impl Operation {
    /// Label shown on buttons and in the log
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Prepare => "Prepare files",
            Operation::ResetPermanently => "Reset permanently",
            Operation::ResetTemporarily => "Reset temporarily",
            Operation::RestoreModifications => "Restore modifications",
            Operation::GeneratePatches => "Generate patches",
            Operation::UpdateGlobal => "Update global files",
            Operation::UpdateSdat => "Update sdat files",
            Operation::Search => "Search",
        }
    }

    /// Whether the user must confirm before this operation runs.
    pub fn requires_confirmation(&self) -> bool {
        self.confirmation_prompt().is_some()
    }

    /// Text of the confirmation prompt, or None for operations that run directly.
    pub fn confirmation_prompt(&self) -> Option<&'static str> {
        match self {
            Operation::Prepare => Some(
                "Prepare files for modding?\n\
                 (only run once unless you permanently restore,\n\
                 otherwise restore modifications instead)\n\
                 Extract dcx files after doing this.",
            ),
            Operation::ResetPermanently => Some(
                "Reset game files to their original state and\n\
                 permanently delete all modifications.",
            ),
            Operation::ResetTemporarily => Some(
                "Reset game files to their original state.\n\
                 Modifications can be restored.",
            ),
            Operation::RestoreModifications => {
                Some("Restore game to previously modified state.")
            }
            Operation::GeneratePatches => Some("Create patch files for current modifications"),
            Operation::UpdateGlobal | Operation::UpdateSdat | Operation::Search => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runtime state of the application.
///
/// Wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`]; go
/// through the manager rather than holding one of these directly.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Configuration
    pub scripts_dir: Option<Utf8PathBuf>,
    pub search_terms: Vec<String>,

    // Search options
    pub case_sensitive: bool,
    pub use_regex: bool,

    // Runtime state
    pub current_operation: Option<Operation>,
    pub last_error: Option<String>,

    // Results of the last search, keyed by file name in result order
    pub last_query: Option<SearchQuery>,
    pub search_results: IndexMap<String, FileMatches>,
}

impl AppState {
    pub fn is_busy(&self) -> bool {
        self.current_operation.is_some()
    }

    /// Build a query for `term` from the current search options.
    pub fn query_for(&self, term: &str) -> SearchQuery {
        SearchQuery::new(term, self.case_sensitive, self.use_regex)
    }

    /// Replace the stored search results.
    pub fn set_search_results(&mut self, query: SearchQuery, results: Vec<FileMatches>) {
        self.last_query = Some(query);
        self.search_results = results
            .into_iter()
            .map(|r| (r.file_name.clone(), r))
            .collect();
    }

    /// Total number of matching lines across all files of the last search.
    pub fn total_matches(&self) -> usize {
        self.search_results.values().map(FileMatches::match_count).sum()
    }

    pub fn clear_search_results(&mut self) {
        self.last_query = None;
        self.search_results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::search::LineMatch;

    fn matches(file_name: &str, lines: &[usize]) -> FileMatches {
        FileMatches {
            file_name: file_name.to_string(),
            matches: lines
                .iter()
                .map(|&n| LineMatch {
                    line_number: n,
                    text: format!("line {}", n),
                })
                .collect(),
            lossy: false,
        }
    }

    #[test]
    fn test_default_state() {
        let state = AppState::default();
        assert!(!state.is_busy());
        assert!(state.scripts_dir.is_none());
        assert!(state.search_results.is_empty());
    }

    #[test]
    fn test_query_uses_options() {
        let mut state = AppState::default();
        state.case_sensitive = true;
        state.use_regex = true;

        let query = state.query_for("Set.*Flag");
        assert_eq!(query, SearchQuery::new("Set.*Flag", true, true));
    }

    #[test]
    fn test_search_results_keep_order() {
        let mut state = AppState::default();
        state.set_search_results(
            SearchQuery::plain("x"),
            vec![matches("b.lua", &[3, 1]), matches("a.lua", &[2])],
        );

        let names: Vec<&String> = state.search_results.keys().collect();
        assert_eq!(names, vec!["b.lua", "a.lua"]);
        assert_eq!(state.total_matches(), 3);

        state.clear_search_results();
        assert!(state.last_query.is_none());
        assert_eq!(state.total_matches(), 0);
    }

    #[test]
    fn test_confirmation_required_for_mutations() {
        assert!(Operation::ResetPermanently.requires_confirmation());
        assert!(Operation::Prepare.requires_confirmation());
        assert!(Operation::GeneratePatches.requires_confirmation());
        assert!(!Operation::Search.requires_confirmation());
        assert!(!Operation::UpdateSdat.requires_confirmation());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::ResetTemporarily.to_string(), "Reset temporarily");
    }
}
