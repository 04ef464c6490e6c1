//! Filesystem access for emitted stylesheets.
//!
//! Only two operations are needed: existence checks for replayed imports and
//! create-with-parents writes for emitted CSS and map files. Nothing under the
//! output directory is ever removed.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Writes a string to a file, creating parent directories as needed.
///
/// If the file already exists, its contents are replaced.
///
/// # Errors
///
/// Returns [`Error::Io`] if a directory or the file cannot be written.
pub fn write_text(path: impl AsRef<Path>, contents: impl AsRef<str>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, contents.as_ref()).map_err(|e| Error::io(path, e))
}

/// Reads the entire contents of a file as a string.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Whether `path` names an existing regular file.
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/nested/b.css");

        write_text(&path, ".b {}\n").unwrap();

        assert!(file_exists(&path));
        assert_eq!(read_text(&path).unwrap(), ".b {}\n");
    }

    #[test]
    fn directories_are_not_files() {
        let dir = tempdir().unwrap();
        assert!(!file_exists(dir.path()));
        assert!(!file_exists(dir.path().join("missing.css")));
    }

    #[test]
    fn read_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.css");

        let err = read_text(&path).unwrap_err();
        assert!(matches!(err, Error::Io { path: p, .. } if p == path));
    }
}
