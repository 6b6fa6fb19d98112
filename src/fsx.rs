//! Filesystem helpers used by the commit pipeline.
//!
//! The rest of the crate goes through these instead of touching `std::fs` directly for
//! the three operations whose semantics matter: exclusive creation, the temp path of an
//! update, and the final rename-with-overwrite.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Suffix appended to the destination while an update is being written.
pub const TEMP_SUFFIX: &str = ".tmp";

/// `<dest>.tmp`, next to the destination so the final rename stays on one filesystem.
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Creates `path` for reading and writing, failing with `AlreadyExists` if it is present.
pub fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).create_new(true).open(path)
}

/// Moves `from` over `to`, replacing `to` if it exists.
///
/// `std::fs::rename` replaces the target on both Unix (`rename(2)`) and Windows
/// (`MoveFileExW` with `MOVEFILE_REPLACE_EXISTING`).
pub fn rename_overwrite(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

/// Removes a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
