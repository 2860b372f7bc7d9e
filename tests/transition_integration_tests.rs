//! Integration tests for the file-state transitions
//!
//! These tests drive whole modding sessions through StateTransitionEngine and check:
//! - The prepare → edit → reset → restore → reset permanently lifecycle
//! - Conflicting extension chains are refused before anything moves
//! - Reset temporarily and restore undo each other in either order (property tests)
//! - A failing step aborts the transition without undoing earlier steps

use camino::{Utf8Path, Utf8PathBuf};
use destuff::models::archive::{ARCHIVE_INDICES, working_archive_name};
use destuff::services::{ArchiveState, FileStateError, FileStateStore, StateTransitionEngine};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn create_scripts_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, dir)
}

/// Name → contents of every file in `dir`
fn dir_contents(dir: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().into_string().unwrap(),
                fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}

fn states(dir: &Utf8Path) -> Vec<(String, ArchiveState)> {
    FileStateStore::open(dir)
        .unwrap()
        .inspect()
        .unwrap()
        .into_iter()
        .map(|slots| {
            let state = slots.state();
            (slots.base, state)
        })
        .collect()
}

#[test]
fn test_full_modding_session() {
    let (_temp_dir, dir) = create_scripts_dir();
    let engine = StateTransitionEngine::new();

    // Fresh install: working copies and the compressed originals
    for index in ARCHIVE_INDICES {
        let sdat = working_archive_name(index);
        let dcx = sdat.trim_end_matches(".sdat").to_string();
        fs::write(dir.join(&sdat), format!("vanilla {}", index)).unwrap();
        fs::write(dir.join(&dcx), format!("dcx {}", index)).unwrap();
    }
    fs::write(dir.join("m01.luabnd"), "bundle").unwrap();

    let report = engine.prepare_files(&dir).unwrap();
    assert_eq!(report.renamed, ARCHIVE_INDICES.len() + 1);
    assert_eq!(report.copied, ARCHIVE_INDICES.len());
    assert!(dir.join("m01.luabnd.bak").is_file());
    assert!(
        states(&dir)
            .iter()
            .all(|(_, state)| *state == ArchiveState::Prepared)
    );

    // Edit one archive
    fs::write(dir.join("m02.luabnd.dcx.sdat"), "edited").unwrap();

    engine.reset_temporarily(&dir).unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("m02.luabnd.dcx.sdat")).unwrap(),
        "vanilla 2"
    );
    assert_eq!(
        fs::read_to_string(dir.join("m02.luabnd.dcx.sdat.modded")).unwrap(),
        "edited"
    );
    assert!(
        states(&dir)
            .iter()
            .all(|(_, state)| *state == ArchiveState::TemporarilyReset)
    );

    engine.restore_modifications(&dir).unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("m02.luabnd.dcx.sdat")).unwrap(),
        "edited"
    );
    assert_eq!(
        fs::read_to_string(dir.join("m02.luabnd.dcx.sdat.bak")).unwrap(),
        "vanilla 2"
    );

    engine.reset_permanently(&dir).unwrap();
    for index in ARCHIVE_INDICES {
        let sdat = dir.join(working_archive_name(index));
        assert_eq!(
            fs::read_to_string(&sdat).unwrap(),
            format!("vanilla {}", index)
        );
        assert!(!sdat.with_extension("sdat.bak").exists());
    }
    assert_eq!(fs::read_to_string(dir.join("m01.luabnd")).unwrap(), "bundle");
    assert!(!dir.join("m01.luabnd.bak").exists());
}

#[test]
fn test_reset_permanently_is_idempotent() {
    let (_temp_dir, dir) = create_scripts_dir();
    fs::write(dir.join("m01.luabnd.dcx.sdat"), "modded").unwrap();
    fs::write(dir.join("m01.luabnd.dcx.sdat.bak"), "pristine").unwrap();
    fs::write(dir.join("m03.luabnd.dcx.sdat"), "never prepared").unwrap();

    let engine = StateTransitionEngine::new();
    engine.reset_permanently(&dir).unwrap();
    let after_first = dir_contents(&dir);

    let report = engine.reset_permanently(&dir).unwrap();

    assert_eq!(report.renamed + report.deleted + report.copied, 0);
    assert_eq!(dir_contents(&dir), after_first);
    assert_eq!(after_first["m01.luabnd.dcx.sdat"], b"pristine");
    assert_eq!(after_first["m03.luabnd.dcx.sdat"], b"never prepared");
}

#[test]
fn test_conflicting_state_refused_without_changes() {
    let (_temp_dir, dir) = create_scripts_dir();
    fs::write(dir.join("m01.luabnd.dcx.sdat"), "current").unwrap();
    fs::write(dir.join("m01.luabnd.dcx.sdat.bak"), "backup").unwrap();
    fs::write(dir.join("m01.luabnd.dcx.sdat.modded"), "saved edits").unwrap();
    fs::write(dir.join("m04.luabnd.dcx.sdat"), "other").unwrap();
    let before = dir_contents(&dir);

    assert_eq!(
        states(&dir)
            .into_iter()
            .find(|(base, _)| base == "m01.luabnd.dcx")
            .map(|(_, state)| state),
        Some(ArchiveState::Conflict)
    );

    let err = StateTransitionEngine::new()
        .reset_temporarily(&dir)
        .unwrap_err();

    assert!(matches!(err, FileStateError::Conflict { .. }));
    assert_eq!(dir_contents(&dir), before);
}

#[test]
fn test_reset_without_backup_is_reported() {
    let (_temp_dir, dir) = create_scripts_dir();
    fs::write(dir.join("m05.luabnd.dcx.sdat"), "modded").unwrap();

    let report = StateTransitionEngine::new()
        .reset_temporarily(&dir)
        .unwrap();

    assert_eq!(report.unrestored, vec![dir.join("m05.luabnd.dcx.sdat")]);
    assert!(!dir.join("m05.luabnd.dcx.sdat").exists());
    assert_eq!(
        states(&dir),
        vec![("m05.luabnd.dcx".to_string(), ArchiveState::Unplayable)]
    );
}

#[test]
fn test_restore_then_reset_is_identity() {
    let (_temp_dir, dir) = create_scripts_dir();
    fs::write(dir.join("m01.luabnd.dcx.sdat"), "pristine").unwrap();
    fs::write(dir.join("m01.luabnd.dcx.sdat.modded"), "edits").unwrap();
    let before = dir_contents(&dir);

    let engine = StateTransitionEngine::new();
    engine.restore_modifications(&dir).unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("m01.luabnd.dcx.sdat")).unwrap(),
        "edits"
    );

    engine.reset_temporarily(&dir).unwrap();
    assert_eq!(dir_contents(&dir), before);
}

#[test]
fn test_failed_step_keeps_earlier_steps_and_stops() {
    let (_temp_dir, dir) = create_scripts_dir();
    fs::write(dir.join("m01.luabnd.dcx"), "dcx 1").unwrap();
    fs::write(dir.join("m01.luabnd.dcx.sdat"), "one").unwrap();
    fs::write(dir.join("m02.luabnd.dcx.sdat"), "two").unwrap();
    fs::write(dir.join("m03.luabnd.dcx.sdat"), "three").unwrap();
    // A directory in the backup slot makes the second rename fail
    fs::create_dir(dir.join("m02.luabnd.dcx.sdat.bak")).unwrap();

    let result = StateTransitionEngine::new().prepare_files(&dir);

    assert!(result.is_err());
    // Done before the failure, not rolled back
    assert_eq!(
        fs::read_to_string(dir.join("m01.luabnd.dcx.sdat.bak")).unwrap(),
        "one"
    );
    // The failed step and everything after it did not run
    assert_eq!(
        fs::read_to_string(dir.join("m02.luabnd.dcx.sdat")).unwrap(),
        "two"
    );
    assert_eq!(
        fs::read_to_string(dir.join("m03.luabnd.dcx.sdat")).unwrap(),
        "three"
    );
    assert!(!dir.join("m03.luabnd.dcx.sdat.bak").exists());
    assert!(!dir.join("m01.luabnd.dcx.sdat").exists());
}

#[test]
fn test_missing_directory() {
    let (_temp_dir, dir) = create_scripts_dir();
    let missing = dir.join("does-not-exist");

    let err = StateTransitionEngine::new()
        .prepare_files(&missing)
        .unwrap_err();

    assert!(matches!(err, FileStateError::NotFound(path) if path == missing));
}

fn archive_strategy() -> impl Strategy<Value = BTreeMap<u8, (Vec<u8>, Option<Vec<u8>>)>> {
    prop::collection::btree_map(
        prop::sample::select(ARCHIVE_INDICES.to_vec()),
        (
            prop::collection::vec(any::<u8>(), 0..64),
            prop::option::of(prop::collection::vec(any::<u8>(), 0..64)),
        ),
        0..ARCHIVE_INDICES.len(),
    )
}

/// Write each archive's working file plus, when present, its `.{suffix}` sibling.
fn write_archives(
    dir: &Utf8Path,
    archives: &BTreeMap<u8, (Vec<u8>, Option<Vec<u8>>)>,
    suffix: &str,
) {
    for (index, (working, saved)) in archives {
        let name = working_archive_name(*index);
        fs::write(dir.join(&name), working).unwrap();
        if let Some(saved) = saved {
            fs::write(dir.join(format!("{}.{}", name, suffix)), saved).unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_reset_then_restore_is_identity(archives in archive_strategy()) {
        let (_temp_dir, dir) = create_scripts_dir();
        write_archives(&dir, &archives, "bak");
        let before = dir_contents(&dir);

        let engine = StateTransitionEngine::new();
        engine.reset_temporarily(&dir).unwrap();
        engine.restore_modifications(&dir).unwrap();

        prop_assert_eq!(dir_contents(&dir), before);
    }

    #[test]
    fn prop_restore_then_reset_is_identity(archives in archive_strategy()) {
        let (_temp_dir, dir) = create_scripts_dir();
        write_archives(&dir, &archives, "modded");
        let before = dir_contents(&dir);

        let engine = StateTransitionEngine::new();
        engine.restore_modifications(&dir).unwrap();
        engine.reset_temporarily(&dir).unwrap();

        prop_assert_eq!(dir_contents(&dir), before);
    }
}
