// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for front-end updates.

use crate::models::settings::promote_search_term;
use crate::models::{AppState, Operation, Settings};
use crate::services::search::{FileMatches, SearchQuery};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// An operation has started
    OperationStarted { operation: Operation },

    /// An operation has finished
    OperationFinished { operation: Operation, success: bool },

    /// A search has produced new results
    SearchCompleted { files: usize, matches: usize },

    /// The search history has changed
    SearchTermsChanged,

    /// The scripts directory has changed
    ScriptsDirectoryChanged,

    /// Case sensitivity or regex mode has changed
    SearchOptionsChanged,

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Serializes operations: only one may run at a time
///   ([`begin_operation`](Self::begin_operation))
///
/// # Related Types
///
/// - [`crate::models::AppState`]: The underlying state structure
/// - [`crate::config::ConfigManager`]: Loads the settings that seed the state
/// - [`crate::ui::Console`]: Primary consumer of state events
pub struct StateManager {
    /// The application state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let busy = state_manager.read(|state| state.is_busy());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            self.emit(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.state_tx.send(change);
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.current_operation != new.current_operation {
            if let Some(operation) = new.current_operation {
                changes.push(StateChange::OperationStarted { operation });
            } else if let Some(operation) = old.current_operation {
                changes.push(StateChange::OperationFinished {
                    operation,
                    success: new.last_error.is_none(),
                });
            }
        }

        if old.scripts_dir != new.scripts_dir {
            changes.push(StateChange::ScriptsDirectoryChanged);
        }

        if old.search_terms != new.search_terms {
            changes.push(StateChange::SearchTermsChanged);
        }

        if old.case_sensitive != new.case_sensitive || old.use_regex != new.use_regex {
            changes.push(StateChange::SearchOptionsChanged);
        }

        changes
    }

    /// Mark `operation` as running.
    ///
    /// Fails with the operation already in progress if there is one; the
    /// caller must not touch the scripts directory in that case.
    pub fn begin_operation(&self, operation: Operation) -> Result<Vec<StateChange>, Operation> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = state.current_operation {
            tracing::warn!("Cannot start '{}' while '{}' is running", operation, running);
            return Err(running);
        }

        let old_state = state.clone();
        state.current_operation = Some(operation);
        state.last_error = None;

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            self.emit(change.clone());
        }
        Ok(changes)
    }

    /// Mark the running operation as finished, recording its error if it failed.
    pub fn finish_operation(&self, error: Option<String>) -> Vec<StateChange> {
        self.update(|state| {
            state.last_error = error;
            state.current_operation = None;
        })
    }

    /// Store new search results and announce them
    pub fn set_search_results(
        &self,
        query: SearchQuery,
        results: Vec<FileMatches>,
    ) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.set_search_results(query, results));

        let (files, matches) = self.read(|s| (s.search_results.len(), s.total_matches()));
        let event = StateChange::SearchCompleted { files, matches };
        self.emit(event.clone());
        changes.push(event);

        changes
    }

    /// Move `term` to the end of the search history (adding it if new)
    pub fn record_search_term(&self, term: &str) -> Vec<StateChange> {
        self.update(|state| {
            promote_search_term(&mut state.search_terms, term);
        })
    }

    /// Remove `term` from the search history
    pub fn remove_search_term(&self, term: &str) -> Vec<StateChange> {
        self.update(|state| state.search_terms.retain(|t| t != term))
    }

    pub fn set_case_sensitive(&self, enabled: bool) -> Vec<StateChange> {
        self.update(|state| state.case_sensitive = enabled)
    }

    pub fn set_use_regex(&self, enabled: bool) -> Vec<StateChange> {
        self.update(|state| state.use_regex = enabled)
    }

    pub fn set_scripts_dir(&self, dir: Option<camino::Utf8PathBuf>) -> Vec<StateChange> {
        self.update(|state| {
            state.scripts_dir = dir;
            state.clear_search_results();
        })
    }

    /// Clear search results and errors, keeping configuration
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.clear_search_results();
            state.last_error = None;
        });

        let event = StateChange::StateReset;
        self.emit(event.clone());
        changes.push(event);

        changes
    }

    /// Populate the state from persisted settings
    pub fn load_from_settings(&self, settings: &Settings) -> Vec<StateChange> {
        self.update(|state| {
            state.scripts_dir = settings.scripts_dir();
            state.search_terms = settings.search_terms.clone();

            tracing::info!(
                "Loaded settings: scripts_dir={:?}, search_terms={}",
                state.scripts_dir,
                state.search_terms.len()
            );
        })
    }

    /// Copy the parts of the state that are persisted back into `settings`
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        self.read(|state| {
            settings.scripts_directory = state
                .scripts_dir
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            settings.search_terms = state.search_terms.clone();
        });
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
