//! Crash-safe file replacement.
//!
//! Output is written to a temporary file in the destination directory and
//! renamed over the destination only once fully written. On any failure the
//! temporary file is removed and the destination is left untouched.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Replace `path` with whatever `write` produces, atomically.
///
/// The existing file's permissions are carried over to the replacement.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(path, e))?;
    if let Ok(metadata) = std::fs::metadata(path) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| Error::io(path, e))?;
    }

    write(temp.as_file_mut()).map_err(|e| Error::io(path, e))?;
    temp.as_file_mut().flush().map_err(|e| Error::io(path, e))?;
    temp.as_file().sync_all().map_err(|e| Error::io(path, e))?;

    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Write `bytes` to `path`, replacing it atomically.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    write_atomic(path, |file| file.write_all(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        std::fs::write(&path, b"old contents").unwrap();

        write_bytes_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_failed_write_keeps_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("form.pdf");
        std::fs::write(&path, b"original").unwrap();

        let result = write_atomic(&path, |file| {
            file.write_all(b"partial")?;
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        });

        assert!(matches!(result, Err(Error::Io { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        // only the original remains in the directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdf");
        match write_bytes_atomic(&path, b"x") {
            Err(Error::Io { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }
}
