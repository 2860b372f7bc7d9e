//! Keeps staged copies in step with the files in the scripts directory.
//!
//! Copies only happen when the destination is missing or its bytes differ,
//! so unchanged files keep their timestamps and do not trigger a repack.

use super::file_state::{FileRole, FileStateStore, Result, list_files};
use crate::models::archive::{ARCHIVE_INDICES, LUA_EXT, SDAT_EXT, extract_script_dir};
use camino::Utf8Path;

/// Copy counts for one sync call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub copied: usize,
    pub unchanged: usize,
}

impl SyncReport {
    fn record(&mut self, copied: bool) {
        if copied {
            self.copied += 1;
        } else {
            self.unchanged += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncEngine;

impl SyncEngine {
    pub fn new() -> Self {
        Self
    }

    /// Push edited global scripts into every extracted archive that contains them.
    ///
    /// For each archive index whose `m0{n}.luabnd.extract/.../script` directory
    /// exists, every `.lua` file in it that also exists directly in `dir` is
    /// refreshed from `dir`. Archives that have not been extracted are skipped.
    pub fn update_global(&self, dir: &Utf8Path) -> Result<SyncReport> {
        let store = FileStateStore::open(dir)?;
        let mut report = SyncReport::default();

        for index in ARCHIVE_INDICES {
            let extract_dir = extract_script_dir(dir, index);
            if !extract_dir.is_dir() {
                tracing::debug!("No extracted scripts for m0{}, skipping", index);
                continue;
            }

            for extracted in list_files(&extract_dir)? {
                if extracted.extension() != Some(LUA_EXT) {
                    continue;
                }
                let Some(name) = extracted.file_name() else {
                    continue;
                };
                let source = dir.join(name);
                if !source.is_file() {
                    continue;
                }
                report.record(store.copy_if_changed(&source, &extracted)?);
            }
        }

        tracing::info!(
            "Updated global scripts in {}: {} copied, {} unchanged",
            dir,
            report.copied,
            report.unchanged
        );
        Ok(report)
    }

    /// Refresh every `.dcx.sdat` working copy from its rebuilt `.dcx` archive.
    pub fn update_sdat(&self, dir: &Utf8Path) -> Result<SyncReport> {
        let store = FileStateStore::open(dir)?;
        let mut report = SyncReport::default();

        let originals = store
            .snapshot()?
            .into_iter()
            .filter(|f| f.role == FileRole::Original);

        for file in originals {
            let sdat_path = file.with_suffix(SDAT_EXT);
            report.record(store.copy_if_changed(&file.path, &sdat_path)?);
        }

        tracing::info!(
            "Updated sdat files in {}: {} copied, {} unchanged",
            dir,
            report.copied,
            report.unchanged
        );
        Ok(report)
    }
}
