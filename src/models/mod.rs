//! Data models for the DeStuff application.
//!
//! - [`Settings`]: User settings persisted to `destuff.yaml` (scripts directory, search history,
//!   window geometry, colors)
//! - [`AppState`]: The runtime state container held by [`StateManager`](crate::state::StateManager)
//! - [`Operation`]: The operations a user can trigger, with their confirmation prompts
//! - [`archive`]: Fixed archive indices, file extensions and archive path helpers

pub mod app_state;
pub mod archive;
pub mod settings;

pub use app_state::{AppState, Operation};
pub use archive::ARCHIVE_INDICES;
pub use settings::{ColorSettings, Settings, WindowSettings};
