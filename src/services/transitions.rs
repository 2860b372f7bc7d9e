//! The named file-state transitions: prepare, reset (permanent/temporary) and restore.
//!
//! Every transition snapshots the directory listing once and works from that
//! snapshot. Each step touches a single path and nothing is rolled back: if a
//! step fails the error is returned and the remaining steps are not attempted.

use super::file_state::{FileRole, FileStateError, FileStateStore, ManagedFile, Result};
use crate::models::archive::{BAK_EXT, LUABND_EXT, MODDED_EXT, SDAT_EXT};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;

/// What a transition did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionReport {
    pub renamed: usize,
    pub copied: usize,
    pub deleted: usize,
    /// Working files that were archived without a counterpart to promote back,
    /// leaving the archive without a working copy.
    pub unrestored: Vec<Utf8PathBuf>,
}

impl TransitionReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} renamed, {} copied, {} deleted",
            self.renamed, self.copied, self.deleted
        );
        if !self.unrestored.is_empty() {
            summary.push_str(&format!(
                ", {} archive(s) left without a working file",
                self.unrestored.len()
            ));
        }
        summary
    }
}

/// Runs the file-state transitions against a scripts directory
#[derive(Debug, Clone, Copy, Default)]
pub struct StateTransitionEngine;

impl StateTransitionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Claim the backup slot for every working file and bundle, then copy
    /// every original `.dcx` archive over its working `.sdat` copy.
    ///
    /// Files whose `.bak` already exists are left in place, so running this
    /// twice does not clobber the first backups. All renames happen before
    /// any copy.
    pub fn prepare_files(&self, dir: &Utf8Path) -> Result<TransitionReport> {
        let store = FileStateStore::open(dir)?;
        let files = store.snapshot()?;
        let mut report = TransitionReport::default();

        for file in &files {
            if !matches!(file.extension(), Some(SDAT_EXT) | Some(LUABND_EXT)) {
                continue;
            }
            let bak_path = file.with_suffix(BAK_EXT);
            if bak_path.is_file() {
                tracing::debug!("Backup already exists, leaving {} in place", file.path);
                continue;
            }
            store.rename(&file.path, &bak_path)?;
            report.renamed += 1;
        }

        for file in files.iter().filter(|f| f.role == FileRole::Original) {
            store.copy(&file.path, &file.with_suffix(SDAT_EXT))?;
            report.copied += 1;
        }

        tracing::info!("Prepared files in {}: {}", dir, report.summary());
        Ok(report)
    }

    /// Swap the working files out to `ext_a` and promote `ext_b` files back.
    ///
    /// Phase one moves every `*.sdat` to `*.sdat{ext_a}`. Phase two moves every
    /// `*.sdat{ext_b}` to `*.sdat`. Extensions may be given with or without the
    /// leading dot.
    ///
    /// Before anything is moved, the snapshot is checked for archives where
    /// phase one would overwrite an existing `*.sdat{ext_a}`; if any are found
    /// the call fails with [`FileStateError::Conflict`] and nothing changes.
    pub fn flip_extensions(
        &self,
        dir: &Utf8Path,
        ext_a: &str,
        ext_b: &str,
    ) -> Result<TransitionReport> {
        let ext_a = ext_a.trim_start_matches('.');
        let ext_b = ext_b.trim_start_matches('.');

        let store = FileStateStore::open(dir)?;
        let files = store.snapshot()?;
        let names: HashSet<&str> = files.iter().map(ManagedFile::file_name).collect();

        let working: Vec<&ManagedFile> = files
            .iter()
            .filter(|f| f.extension() == Some(SDAT_EXT))
            .collect();

        for file in &working {
            let archived = format!("{}.{}", file.file_name(), ext_a);
            if names.contains(archived.as_str()) {
                return Err(FileStateError::Conflict {
                    base: file.file_name().to_string(),
                    detail: format!("{} already exists and would be overwritten", archived),
                });
            }
        }

        let mut report = TransitionReport::default();

        for file in &working {
            store.rename(&file.path, &file.with_suffix(ext_a))?;
            report.renamed += 1;

            let counterpart = format!("{}.{}", file.file_name(), ext_b);
            if !names.contains(counterpart.as_str()) {
                report.unrestored.push(file.path.clone());
            }
        }

        for file in files.iter().filter(|f| f.extension() == Some(ext_b)) {
            let restored = file.without_suffix();
            if restored.extension() != Some(SDAT_EXT) {
                continue;
            }
            store.rename(&file.path, &restored)?;
            report.renamed += 1;
        }

        for path in &report.unrestored {
            tracing::warn!(
                "No .{} counterpart for {}; archive has no working file now",
                ext_b,
                path
            );
        }

        Ok(report)
    }

    /// Archive the modified working files as `.modded` and bring the pristine
    /// backups back. Reversible with [`restore_modifications`](Self::restore_modifications).
    pub fn reset_temporarily(&self, dir: &Utf8Path) -> Result<TransitionReport> {
        let report = self.flip_extensions(dir, MODDED_EXT, BAK_EXT)?;
        tracing::info!("Reset {} temporarily: {}", dir, report.summary());
        Ok(report)
    }

    /// Archive the pristine working files as `.bak` and bring the saved
    /// modifications back.
    pub fn restore_modifications(&self, dir: &Utf8Path) -> Result<TransitionReport> {
        let report = self.flip_extensions(dir, BAK_EXT, MODDED_EXT)?;
        tracing::info!("Restored modifications in {}: {}", dir, report.summary());
        Ok(report)
    }

    /// Throw away the working files and put every backup back in place.
    ///
    /// A working file is deleted when a backup of it exists; a backup is then
    /// renamed to its original name, or deleted if that name is taken. Working
    /// files with no backup are already pristine and are kept, which makes a
    /// second call a no-op. This cannot be undone.
    pub fn reset_permanently(&self, dir: &Utf8Path) -> Result<TransitionReport> {
        let store = FileStateStore::open(dir)?;
        let files = store.snapshot()?;
        let names: HashSet<&str> = files.iter().map(ManagedFile::file_name).collect();
        let mut report = TransitionReport::default();

        for file in files.iter().filter(|f| f.extension() == Some(SDAT_EXT)) {
            let backup = format!("{}.{}", file.file_name(), BAK_EXT);
            if !names.contains(backup.as_str()) {
                tracing::debug!("No backup for {}, keeping it", file.path);
                continue;
            }
            store.remove(&file.path)?;
            report.deleted += 1;
        }

        for file in files.iter().filter(|f| f.extension() == Some(BAK_EXT)) {
            let restored = file.without_suffix();
            if restored.is_file() {
                store.remove(&file.path)?;
                report.deleted += 1;
            } else {
                store.rename(&file.path, &restored)?;
                report.renamed += 1;
            }
        }

        tracing::info!("Reset {} permanently: {}", dir, report.summary());
        Ok(report)
    }
}
