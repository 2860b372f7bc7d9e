//! Services module - Pure business logic for managing the game's script files.
//!
//! The services operate on a scripts directory passed in by the caller and keep no
//! state between calls: everything that matters lives on disk as file extensions.
//! They are **framework-agnostic** and have no dependencies on the UI layer.
//!
//! # Components
//!
//! - [`FileStateStore`]: Lists the directory, classifies files by extension chain
//!   ([`FileRole`], [`ArchiveState`]) and performs the individual renames, copies and deletes.
//! - [`StateTransitionEngine`]: The named transitions:
//!   - prepare (claim backups, copy `.dcx` archives to working `.sdat` files)
//!   - reset temporarily / restore modifications (swap `.sdat` with `.bak` / `.modded`)
//!   - reset permanently (drop working files, restore backups)
//! - [`SyncEngine`]: Refreshes extracted scripts and working copies only when content differs.
//! - [`PatchGenerator`]: Writes a unified diff of backup vs. working archive per archive index.
//! - [`SearchEngine`]: Plain or regex search over `.lua` scripts with per-line results.
//!
//! # Concurrency
//!
//! Every operation is synchronous and runs to completion on the calling thread.
//! Two operations must never run against the same directory at once; the caller
//! serializes them (see [`StateManager::begin_operation`](crate::state::StateManager::begin_operation)).
//!
//! # Usage Example
//!
//! ```ignore
//! use destuff::services::{SearchEngine, SearchQuery, StateTransitionEngine};
//!
//! let engine = StateTransitionEngine::new();
//! engine.reset_temporarily(&scripts_dir)?;
//!
//! let results = SearchEngine::new(SearchQuery::plain("SetEventFlag"))?.search(&scripts_dir)?;
//! ```

pub mod file_state;
pub mod patch;
pub mod search;
pub mod sync;
pub mod transitions;

pub use file_state::{
    ArchiveSlots, ArchiveState, FileRole, FileStateError, FileStateStore, ManagedFile,
};
pub use patch::{PatchError, PatchGenerator, PatchReport};
pub use search::{FileMatches, LineMatch, SearchEngine, SearchError, SearchQuery};
pub use sync::{SyncEngine, SyncReport};
pub use transitions::{StateTransitionEngine, TransitionReport};
