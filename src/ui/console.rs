// Console front end
//
// Reads one command per line, runs it against the services and prints the
// outcome. It owns the confirmation prompts and the result formatting; the
// services themselves never talk to the user.

use crate::config::ConfigManager;
use crate::metrics::METRICS;
use crate::models::{Operation, Settings};
use crate::services::file_state;
use crate::services::search::{format_file_entry, format_line_entry};
use crate::services::{
    FileStateStore, PatchGenerator, SearchEngine, StateTransitionEngine, SyncEngine,
    TransitionReport,
};
use crate::state::StateManager;
use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{BufRead, Write};

const HELP: &str = "\
Commands:
  dir [path]          show or set the scripts directory
  status              show the state of every archive
  prepare             back up the game files and prepare them for modding
  reset-permanent     restore the original files and delete all modifications
  reset-temporary     restore the original files, keeping modifications
  restore             bring back the modifications saved by reset-temporary
  patches [out_dir]   write a patch file per modified archive
  update-global       copy edited global scripts into the extracted archives
  update-sdat         copy the .dcx archives over their .sdat working files
  search <term>       search the .lua scripts
  show <file>         list the matching lines of a file from the last search
  case on|off         toggle case-sensitive search
  regex on|off        toggle regular expression search
  history             list previous search terms
  forget <term>       remove a term from the history
  help                show this text
  quit                exit";

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dir(Option<Utf8PathBuf>),
    Status,
    Prepare,
    ResetPermanently,
    ResetTemporarily,
    Restore,
    Patches(Option<Utf8PathBuf>),
    UpdateGlobal,
    UpdateSdat,
    Search(String),
    Show(String),
    CaseSensitive(bool),
    Regex(bool),
    History,
    Forget(String),
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let optional_path = || (!arg.is_empty()).then(|| Utf8PathBuf::from(arg));

        let command = match name.to_ascii_lowercase().as_str() {
            "dir" => Command::Dir(optional_path()),
            "status" => Command::Status,
            "prepare" => Command::Prepare,
            "reset-permanent" => Command::ResetPermanently,
            "reset-temporary" => Command::ResetTemporarily,
            "restore" => Command::Restore,
            "patches" => Command::Patches(optional_path()),
            "update-global" => Command::UpdateGlobal,
            "update-sdat" => Command::UpdateSdat,
            "search" => Command::Search(required(name, arg)?),
            "show" => Command::Show(required(name, arg)?),
            "case" => Command::CaseSensitive(parse_toggle(name, arg)?),
            "regex" => Command::Regex(parse_toggle(name, arg)?),
            "history" => Command::History,
            "forget" => Command::Forget(required(name, arg)?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command '{}', type 'help' for a list", other),
        };

        Ok(Some(command))
    }
}

fn required(name: &str, arg: &str) -> Result<String> {
    if arg.is_empty() {
        bail!("'{}' needs an argument", name);
    }
    Ok(arg.to_string())
}

fn parse_toggle(name: &str, arg: &str) -> Result<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => bail!("Usage: {} on|off", name),
    }
}

/// Interactive console over any line-based input and output
pub struct Console<R, W> {
    input: R,
    output: W,
    state: StateManager,
    config: ConfigManager,
    settings: Settings,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(
        input: R,
        output: W,
        state: StateManager,
        config: ConfigManager,
        settings: Settings,
    ) -> Self {
        Self {
            input,
            output,
            state,
            config,
            settings,
        }
    }

    /// Read and execute commands until `quit` or end of input.
    ///
    /// Command failures are printed and the loop carries on; only I/O errors
    /// on the console itself end it early.
    pub fn run(&mut self) -> Result<()> {
        writeln!(
            self.output,
            "{} {} - type 'help' for commands",
            crate::APP_NAME,
            crate::VERSION
        )?;

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                break;
            };

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(self.output, "{}", e)?;
                    continue;
                }
            };

            if command == Command::Quit {
                break;
            }

            if let Err(e) = self.execute(command) {
                tracing::error!("Command failed: {:#}", e);
                writeln!(self.output, "Error: {:#}", e)?;
            }
        }

        Ok(())
    }

    /// Hand back the settings as last saved, so the caller can persist them once more.
    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn execute(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Dir(None) => {
                let dir = self.state.read(|s| s.scripts_dir.clone());
                match dir {
                    Some(dir) => writeln!(self.output, "Scripts directory: {}", dir)?,
                    None => writeln!(self.output, "Scripts directory is not set")?,
                }
            }
            Command::Dir(Some(dir)) => {
                if !dir.is_dir() {
                    bail!("Not a directory: {}", dir);
                }
                self.state.set_scripts_dir(Some(dir.clone()));
                self.save_settings()?;
                writeln!(self.output, "Scripts directory set to {}", dir)?;
            }
            Command::Status => self.print_status()?,
            Command::Prepare => self.transition(Operation::Prepare, |engine, dir| {
                engine.prepare_files(dir)
            })?,
            Command::ResetPermanently => {
                self.transition(Operation::ResetPermanently, |engine, dir| {
                    engine.reset_permanently(dir)
                })?
            }
            Command::ResetTemporarily => {
                self.transition(Operation::ResetTemporarily, |engine, dir| {
                    engine.reset_temporarily(dir)
                })?
            }
            Command::Restore => self.transition(Operation::RestoreModifications, |engine, dir| {
                engine.restore_modifications(dir)
            })?,
            Command::Patches(out_dir) => {
                let out_dir = out_dir.unwrap_or_else(|| Utf8PathBuf::from("."));
                let report = self.run_operation(Operation::GeneratePatches, |dir| {
                    Ok(PatchGenerator::new().generate_patches(dir, &out_dir)?)
                })?;
                if let Some(report) = report {
                    for path in &report.written {
                        writeln!(self.output, "Wrote {}", path)?;
                    }
                    for index in &report.skipped {
                        writeln!(self.output, "file not found: {}", index)?;
                    }
                }
            }
            Command::UpdateGlobal => {
                let report = self.run_operation(Operation::UpdateGlobal, |dir| {
                    Ok(SyncEngine::new().update_global(dir)?)
                })?;
                if let Some(report) = report {
                    writeln!(
                        self.output,
                        "Global files updated: {} copied, {} unchanged",
                        report.copied, report.unchanged
                    )?;
                }
            }
            Command::UpdateSdat => {
                let report = self.run_operation(Operation::UpdateSdat, |dir| {
                    Ok(SyncEngine::new().update_sdat(dir)?)
                })?;
                if let Some(report) = report {
                    writeln!(
                        self.output,
                        "sdat files updated: {} copied, {} unchanged",
                        report.copied, report.unchanged
                    )?;
                }
            }
            Command::Search(term) => self.search(&term)?,
            Command::Show(file_name) => self.show(&file_name)?,
            Command::CaseSensitive(enabled) => {
                self.state.set_case_sensitive(enabled);
                writeln!(self.output, "Case-sensitive search {}", on_off(enabled))?;
            }
            Command::Regex(enabled) => {
                self.state.set_use_regex(enabled);
                writeln!(self.output, "Regex search {}", on_off(enabled))?;
            }
            Command::History => {
                self.state.apply_to_settings(&mut self.settings);
                if self.settings.search_terms.is_empty() {
                    writeln!(self.output, "No previous searches")?;
                }
                for (i, term) in self.settings.recent_search_terms().enumerate() {
                    writeln!(self.output, "{:>3}  {}", i + 1, term)?;
                }
            }
            Command::Forget(term) => {
                if self.state.remove_search_term(&term).is_empty() {
                    writeln!(self.output, "'{}' is not in the history", term)?;
                } else {
                    self.save_settings()?;
                    writeln!(self.output, "Forgot '{}'", term)?;
                }
            }
            Command::Help => writeln!(self.output, "{}", HELP)?,
            Command::Quit => {}
        }

        Ok(())
    }

    fn transition<F>(&mut self, operation: Operation, f: F) -> Result<()>
    where
        F: FnOnce(&StateTransitionEngine, &Utf8Path) -> file_state::Result<TransitionReport>,
    {
        let engine = StateTransitionEngine::new();
        let report = self.run_operation(operation, |dir| Ok(f(&engine, dir)?))?;

        if let Some(report) = report {
            writeln!(self.output, "{}: {}", operation, report.summary())?;
            for path in &report.unrestored {
                writeln!(self.output, "  no file to restore for {}", path)?;
            }
        }
        Ok(())
    }

    /// Confirm if needed, then run `f` against the scripts directory while
    /// holding the operation slot. Returns None if the user declined.
    fn run_operation<T, F>(&mut self, operation: Operation, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&Utf8Path) -> Result<T>,
    {
        let dir = self.scripts_dir()?;

        if let Some(prompt) = operation.confirmation_prompt() {
            if !self.confirm(prompt)? {
                writeln!(self.output, "Cancelled")?;
                return Ok(None);
            }
        }

        self.state
            .begin_operation(operation)
            .map_err(|running| anyhow!("'{}' is still running", running))?;

        tracing::info!("Running '{}' in {}", operation, dir);
        match f(&dir) {
            Ok(value) => {
                self.state.finish_operation(None);
                Ok(Some(value))
            }
            Err(e) => {
                METRICS.record_operation_failed();
                self.state.finish_operation(Some(format!("{:#}", e)));
                Err(e.context(format!("{} failed", operation)))
            }
        }
    }

    fn search(&mut self, term: &str) -> Result<()> {
        let query = self.state.read(|s| s.query_for(term));
        let engine = SearchEngine::new(query.clone())?;

        self.state.record_search_term(term);
        self.save_settings()?;

        let Some(results) = self.run_operation(Operation::Search, |dir| Ok(engine.search(dir)?))?
        else {
            return Ok(());
        };

        self.state.set_search_results(query, results);

        let (total, entries) = self.state.read(|s| {
            let entries: Vec<String> = s.search_results.values().map(format_file_entry).collect();
            (s.total_matches(), entries)
        });

        writeln!(self.output, "{} matches in {} files", total, entries.len())?;
        for entry in entries {
            writeln!(self.output, "{}", entry)?;
        }
        Ok(())
    }

    fn show(&mut self, file_name: &str) -> Result<()> {
        let lines = self.state.read(|s| {
            s.search_results
                .get(file_name)
                .map(|file| file.matches.iter().map(format_line_entry).collect::<Vec<_>>())
        });

        let Some(lines) = lines else {
            bail!("'{}' is not in the last search results", file_name);
        };
        for line in lines {
            writeln!(self.output, "{}", line)?;
        }
        Ok(())
    }

    fn print_status(&mut self) -> Result<()> {
        let dir = self.scripts_dir()?;
        let store = FileStateStore::open(&dir)?;
        let archives = store.inspect()?;

        writeln!(self.output, "Scripts directory: {}", dir)?;
        if archives.is_empty() {
            writeln!(self.output, "No game archives found")?;
        }
        for archive in archives {
            writeln!(self.output, "  {:<24} {:?}", archive.base, archive.state())?;
        }
        Ok(())
    }

    fn scripts_dir(&self) -> Result<Utf8PathBuf> {
        self.state
            .read(|s| s.scripts_dir.clone())
            .ok_or_else(|| anyhow!("Scripts directory is not set, use 'dir <path>'"))
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        write!(self.output, "{} [y/N] ", prompt)?;
        self.output.flush()?;

        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from console")?;
        Ok((read > 0).then_some(line))
    }

    fn save_settings(&mut self) -> Result<()> {
        self.state.apply_to_settings(&mut self.settings);
        self.config.save_settings(&self.settings)
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
