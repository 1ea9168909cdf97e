//! Filesystem helpers shared by the state store, deployer and patcher

use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// Write `contents` to a temporary file next to `path`, ready to be renamed into place.
///
/// The parent directory is created when missing. Dropping the returned file
/// without persisting it removes it.
pub fn stage_file(path: &Utf8Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

/// Replace `path` with `contents` via a same-directory temporary file and rename
pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let staged = stage_file(path, contents)?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}
