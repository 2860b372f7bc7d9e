//! Patch generation for modified script archives.
//!
//! The archives are binary, so both the backup and the current working file
//! are hex-encoded before diffing. The hex is wrapped at [`HEX_BYTES_PER_LINE`]
//! bytes per line so the line-based unified diff produces local hunks.

use super::file_state::FileStateError;
use crate::metrics::METRICS;
use crate::models::archive::{ARCHIVE_INDICES, BAK_EXT, working_archive_name};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;

/// Bytes encoded per line of hex text.
pub const HEX_BYTES_PER_LINE: usize = 32;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create patch directory {path}: {source}")]
    OutputDir {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write patch {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    FileState(#[from] FileStateError),
}

/// Outcome of a patch generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Patch files written, in archive index order
    pub written: Vec<Utf8PathBuf>,
    /// Archive indices skipped because the working file or its backup was missing
    pub skipped: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatchGenerator;

impl PatchGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Write `<archive>.patch` into `out_dir` for every archive that has both
    /// a working file and a `.bak` backup in `dir`.
    ///
    /// A missing file skips that archive only; the rest of the batch still runs.
    pub fn generate_patches(
        &self,
        dir: &Utf8Path,
        out_dir: &Utf8Path,
    ) -> Result<PatchReport, PatchError> {
        if !dir.is_dir() {
            return Err(FileStateError::NotFound(dir.to_path_buf()).into());
        }
        fs::create_dir_all(out_dir).map_err(|source| PatchError::OutputDir {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let mut report = PatchReport::default();

        for index in ARCHIVE_INDICES {
            let name = working_archive_name(index);
            let current_path = dir.join(&name);
            let backup_path = dir.join(format!("{}.{}", name, BAK_EXT));

            let (Some(current), Some(backup)) =
                (read_optional(&current_path)?, read_optional(&backup_path)?)
            else {
                tracing::warn!("File not found for archive {}, no patch generated", index);
                METRICS.record_patch_skipped();
                report.skipped.push(index);
                continue;
            };

            let patch_text = make_patch(&backup, &current);
            let patch_path = out_dir.join(format!("{}.patch", name));
            fs::write(&patch_path, patch_text).map_err(|source| PatchError::Write {
                path: patch_path.clone(),
                source,
            })?;

            METRICS.record_patch_written();
            tracing::debug!("Wrote {}", patch_path);
            report.written.push(patch_path);
        }

        tracing::info!(
            "Generated {} patch(es) into {}, skipped {:?}",
            report.written.len(),
            out_dir,
            report.skipped
        );
        Ok(report)
    }
}

/// Unified diff from the hex of `original` to the hex of `modified`.
pub fn make_patch(original: &[u8], modified: &[u8]) -> String {
    let original_hex = hex_lines(original);
    let modified_hex = hex_lines(modified);
    diffy::create_patch(&original_hex, &modified_hex).to_string()
}

/// Lowercase hex, [`HEX_BYTES_PER_LINE`] bytes per newline-terminated line.
pub fn hex_lines(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + bytes.len() / HEX_BYTES_PER_LINE + 1);
    for chunk in bytes.chunks(HEX_BYTES_PER_LINE) {
        out.extend(chunk.iter().map(|byte| format!("{byte:02x}")));
        out.push('\n');
    }
    out
}

fn read_optional(path: &Utf8Path) -> Result<Option<Vec<u8>>, PatchError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PatchError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
