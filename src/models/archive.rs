use camino::{Utf8Path, Utf8PathBuf};

/// Archive indices of the game's script bundles (`m01` .. `m08`, there is no `m07`).
pub const ARCHIVE_INDICES: [u8; 7] = [1, 2, 3, 4, 5, 6, 8];

/// Path segments below `m0{n}.luabnd.extract` that hold the extracted scripts.
const EXTRACT_SCRIPT_SEGMENTS: [&str; 4] = ["DemonsSoul", "data", "DVDROOT", "script"];

/// Extension of the original compressed archives.
pub const DCX_EXT: &str = "dcx";
/// Extension of the working copies consumed by the game.
pub const SDAT_EXT: &str = "sdat";
/// Extension of loose script bundles.
pub const LUABND_EXT: &str = "luabnd";
/// Extension of pristine backups.
pub const BAK_EXT: &str = "bak";
/// Extension of saved modified working copies.
pub const MODDED_EXT: &str = "modded";
/// Extension of script files.
pub const LUA_EXT: &str = "lua";

/// Name of the working archive for an index, e.g. `m01.luabnd.dcx.sdat`.
pub fn working_archive_name(index: u8) -> String {
    format!("m0{}.luabnd.dcx.sdat", index)
}

/// Directory that the archive rebuild tool extracts the scripts of an index into.
pub fn extract_script_dir(dir: &Utf8Path, index: u8) -> Utf8PathBuf {
    let mut path = dir.join(format!("m0{}.luabnd.extract", index));
    for segment in EXTRACT_SCRIPT_SEGMENTS {
        path.push(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_archive_name() {
        assert_eq!(working_archive_name(1), "m01.luabnd.dcx.sdat");
        assert_eq!(working_archive_name(8), "m08.luabnd.dcx.sdat");
    }

    #[test]
    fn test_extract_script_dir() {
        let path = extract_script_dir(Utf8Path::new("scripts"), 3);
        let segments: Vec<&str> = path.iter().collect();
        assert_eq!(
            segments,
            vec!["scripts", "m03.luabnd.extract", "DemonsSoul", "data", "DVDROOT", "script"]
        );
    }

    #[test]
    fn test_no_seventh_archive() {
        assert!(!ARCHIVE_INDICES.contains(&7));
        assert_eq!(ARCHIVE_INDICES.len(), 7);
    }
}
