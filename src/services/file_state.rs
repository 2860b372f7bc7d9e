//! On-disk file state for the managed game archives.
//!
//! A file's role is encoded entirely in its extension chain:
//!
//! | suffix              | role                                  |
//! |---------------------|---------------------------------------|
//! | `.dcx`              | original compressed archive           |
//! | `.dcx.sdat`         | working copy read by the game         |
//! | `.dcx.sdat.bak`     | backup of the pristine working copy   |
//! | `.dcx.sdat.modded`  | saved modified working copy           |
//!
//! [`FileStateStore`] is the only place that touches the filesystem for the
//! transition and sync services. Every mutation is a single rename, copy or
//! delete on one path and is counted in [`METRICS`](crate::metrics::METRICS).

use crate::metrics::METRICS;
use crate::models::archive::{BAK_EXT, DCX_EXT, LUA_EXT, LUABND_EXT, MODDED_EXT, SDAT_EXT};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::io;
use thiserror::Error;

/// Errors raised while reading or mutating the scripts directory
#[derive(Error, Debug)]
pub enum FileStateError {
    #[error("Not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Inconsistent archive state for {base}: {detail}")]
    Conflict { base: String, detail: String },
}

impl FileStateError {
    fn from_io(action: &'static str, path: &Utf8Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FileStateError::NotFound(path.to_path_buf())
        } else {
            FileStateError::Io {
                action,
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

pub type Result<T, E = FileStateError> = std::result::Result<T, E>;

/// Role of a file in the scripts directory, derived from its extension chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// `*.dcx`
    Original,
    /// `*.sdat`
    Working,
    /// `*.sdat.bak`
    Backup,
    /// `*.sdat.modded`
    Modded,
    /// `*.luabnd`
    Bundle,
    /// `*.luabnd.bak`
    BundleBackup,
    /// `*.lua`
    Script,
    Other,
}

impl FileRole {
    /// Classify a file name by its last two extensions.
    pub fn classify(file_name: &str) -> Self {
        let path = Utf8Path::new(file_name);
        let ext = path.extension();
        let inner = path.file_stem().and_then(|stem| Utf8Path::new(stem).extension());

        match (inner, ext) {
            (Some(SDAT_EXT), Some(BAK_EXT)) => FileRole::Backup,
            (Some(SDAT_EXT), Some(MODDED_EXT)) => FileRole::Modded,
            (Some(LUABND_EXT), Some(BAK_EXT)) => FileRole::BundleBackup,
            (_, Some(SDAT_EXT)) => FileRole::Working,
            (_, Some(DCX_EXT)) => FileRole::Original,
            (_, Some(LUABND_EXT)) => FileRole::Bundle,
            (_, Some(LUA_EXT)) => FileRole::Script,
            _ => FileRole::Other,
        }
    }
}

/// A file in the scripts directory together with its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedFile {
    pub path: Utf8PathBuf,
    pub role: FileRole,
}

impl ManagedFile {
    pub fn new(path: Utf8PathBuf) -> Self {
        let role = path
            .file_name()
            .map(FileRole::classify)
            .unwrap_or(FileRole::Other);
        Self { path, role }
    }

    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }

    /// The file's final extension, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension()
    }

    /// Path with the final extension appended, e.g. `x.sdat` -> `x.sdat.bak`.
    pub fn with_suffix(&self, ext: &str) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}.{}", self.path, ext))
    }

    /// Path with the final extension removed, e.g. `x.sdat.bak` -> `x.sdat`.
    pub fn without_suffix(&self) -> Utf8PathBuf {
        self.path.with_extension("")
    }

    /// Name of the archive this file belongs to, e.g. `m01.luabnd.dcx`.
    pub fn archive_base(&self) -> Option<String> {
        let name = self.file_name();
        match self.role {
            FileRole::Original => Some(name.to_string()),
            FileRole::Working => name.strip_suffix(".sdat").map(str::to_string),
            FileRole::Backup => name.strip_suffix(".sdat.bak").map(str::to_string),
            FileRole::Modded => name.strip_suffix(".sdat.modded").map(str::to_string),
            _ => None,
        }
    }
}

/// Which files of one archive are present on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSlots {
    pub base: String,
    pub original: bool,
    pub working: bool,
    pub backup: bool,
    pub modded: bool,
}

/// State of one archive, derived from [`ArchiveSlots`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    /// Working copy only; files were never prepared
    Unprepared,
    /// Working copy plus pristine backup; modifications are live
    Prepared,
    /// Working copy is pristine, modifications saved under `.modded`
    TemporarilyReset,
    /// No working copy; the game cannot load this archive
    Unplayable,
    /// Both `.bak` and `.modded` exist, so the next flip would overwrite one
    Conflict,
}

impl ArchiveSlots {
    pub fn state(&self) -> ArchiveState {
        match (self.working, self.backup, self.modded) {
            (_, true, true) => ArchiveState::Conflict,
            (false, _, _) => ArchiveState::Unplayable,
            (true, true, false) => ArchiveState::Prepared,
            (true, false, true) => ArchiveState::TemporarilyReset,
            (true, false, false) => ArchiveState::Unprepared,
        }
    }
}

/// Filesystem access for a single scripts directory
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: Utf8PathBuf,
}

impl FileStateStore {
    /// Open the store for `dir`, which must be an existing directory.
    pub fn open<P: AsRef<Utf8Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(FileStateError::NotFound(dir));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// List the regular files directly in the directory, sorted by name.
    ///
    /// Transitions take this snapshot once and work from it; files created
    /// or renamed while the transition runs are not picked up.
    pub fn snapshot(&self) -> Result<Vec<ManagedFile>> {
        list_files(&self.dir).map(|paths| paths.into_iter().map(ManagedFile::new).collect())
    }

    /// Group the snapshot by archive and report which slots are filled.
    pub fn inspect(&self) -> Result<Vec<ArchiveSlots>> {
        let mut archives: IndexMap<String, ArchiveSlots> = IndexMap::new();

        for file in self.snapshot()? {
            let Some(base) = file.archive_base() else {
                continue;
            };
            let slots = archives.entry(base.clone()).or_insert_with(|| ArchiveSlots {
                base,
                ..ArchiveSlots::default()
            });
            match file.role {
                FileRole::Original => slots.original = true,
                FileRole::Working => slots.working = true,
                FileRole::Backup => slots.backup = true,
                FileRole::Modded => slots.modded = true,
                _ => {}
            }
        }

        Ok(archives.into_values().collect())
    }

    pub fn rename(&self, from: &Utf8Path, to: &Utf8Path) -> Result<()> {
        fs::rename(from, to).map_err(|e| FileStateError::from_io("rename", from, e))?;
        METRICS.record_rename();
        tracing::debug!("Renamed {} -> {}", from, to);
        Ok(())
    }

    pub fn copy(&self, from: &Utf8Path, to: &Utf8Path) -> Result<()> {
        copy_file(from, to)
    }

    pub fn remove(&self, path: &Utf8Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| FileStateError::from_io("delete", path, e))?;
        METRICS.record_delete();
        tracing::debug!("Deleted {}", path);
        Ok(())
    }

    /// Copy `from` over `to` unless `to` already holds the same bytes.
    ///
    /// Returns true if a copy was made.
    pub fn copy_if_changed(&self, from: &Utf8Path, to: &Utf8Path) -> Result<bool> {
        copy_if_changed(from, to)
    }
}

/// Regular files directly in `dir`, sorted by name.
pub(crate) fn list_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| FileStateError::from_io("list", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FileStateError::from_io("list", dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| FileStateError::from_io("list", dir, e))?;
        if !file_type.is_file() {
            continue;
        }
        // Such names never carry one of the managed extensions
        match Utf8PathBuf::try_from(entry.path()) {
            Ok(path) => files.push(path),
            Err(e) => tracing::warn!("Ignoring file with non-UTF-8 name: {:?}", e.as_path()),
        }
    }

    files.sort();
    Ok(files)
}

pub(crate) fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| FileStateError::from_io("copy", from, e))?;
    METRICS.record_copy();
    tracing::debug!("Copied {} -> {}", from, to);
    Ok(())
}

pub(crate) fn copy_if_changed(from: &Utf8Path, to: &Utf8Path) -> Result<bool> {
    if to.is_file() && contents_equal(from, to)? {
        METRICS.record_copy_unchanged();
        tracing::debug!("Unchanged, not copying: {}", to);
        return Ok(false);
    }
    copy_file(from, to)?;
    Ok(true)
}

/// Byte-for-byte comparison of two files.
pub fn contents_equal(a: &Utf8Path, b: &Utf8Path) -> Result<bool> {
    let len_a = fs::metadata(a)
        .map_err(|e| FileStateError::from_io("read", a, e))?
        .len();
    let len_b = fs::metadata(b)
        .map_err(|e| FileStateError::from_io("read", b, e))?
        .len();
    if len_a != len_b {
        return Ok(false);
    }

    let bytes_a = fs::read(a).map_err(|e| FileStateError::from_io("read", a, e))?;
    let bytes_b = fs::read(b).map_err(|e| FileStateError::from_io("read", b, e))?;
    Ok(bytes_a == bytes_b)
}
