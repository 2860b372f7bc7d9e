//! DeStuff - script modding helper for Demon's Souls
//!
//! Main entry point for the console application.
//!
//! # Overview
//!
//! This binary crate provides the console front end for DeStuff. It initializes:
//! - Logging infrastructure (daily rotating file in `logs/`)
//! - State management ([`StateManager`])
//! - Settings loading ([`ConfigManager`], `destuff.yaml` in the working directory)
//! - A background listener that logs [`StateChange`] events
//! - The [`Console`] read-eval loop over stdin/stdout
//!
//! # Arguments
//!
//! - `--debug`: log at debug level
//! - `--config-dir <dir>`: where `destuff.yaml` lives (default: the working directory)

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use destuff::metrics::METRICS;
use destuff::ui::Console;
use destuff::{APP_NAME, ConfigManager, StateChange, StateManager, VERSION};
use std::io;
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(name = "destuff")]
#[command(
    about = "Script file manager, patch generator and script search for Demon's Souls modding",
    long_about = None
)]
#[command(version)]
struct Args {
    /// Log at debug level
    #[arg(long)]
    debug: bool,

    /// Directory holding destuff.yaml
    #[arg(long, default_value = ".")]
    config_dir: Utf8PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Held until the end of main so buffered log lines are flushed
    let _guard = destuff::logging::setup_logging("logs", "destuff", args.debug)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let state_manager = StateManager::new();
    spawn_state_listener(&state_manager);

    let config_manager = ConfigManager::new(&args.config_dir)?;
    let settings = config_manager.load_settings()?;
    state_manager.load_from_settings(&settings);

    let stdin = io::stdin();
    let mut console = Console::new(
        stdin.lock(),
        io::stdout(),
        state_manager.clone(),
        config_manager.clone(),
        settings,
    );
    console.run()?;

    let mut settings = console.into_settings();
    state_manager.apply_to_settings(&mut settings);
    config_manager.save_settings(&settings)?;

    METRICS.log_summary();
    tracing::info!("Application shutdown complete");

    Ok(())
}

/// Log every state change on a background thread.
fn spawn_state_listener(state_manager: &StateManager) {
    let mut rx = state_manager.subscribe();

    std::thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(StateChange::OperationFinished {
                    operation,
                    success: false,
                }) => tracing::warn!("'{}' finished with an error", operation),
                Ok(change) => tracing::debug!("State change: {:?}", change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("State listener lagged, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["destuff"]).unwrap();
        assert!(!args.debug);
        assert_eq!(args.config_dir, Utf8PathBuf::from("."));
    }

    #[test]
    fn test_args_equals_form() {
        let args = Args::try_parse_from(["destuff", "--debug", "--config-dir=cfg"]).unwrap();
        assert!(args.debug);
        assert_eq!(args.config_dir, Utf8PathBuf::from("cfg"));
    }

    #[test]
    fn test_help_is_not_an_error() {
        let err = Args::try_parse_from(["destuff", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["destuff", "--frobnicate"]).is_err());
    }
}
