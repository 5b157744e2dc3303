/*
 * native.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * NativeRuntime implementation backed by std::fs.
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use crate::traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime};

/// Runtime with full access to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    /// Create a new native runtime.
    pub fn new() -> Self {
        Self
    }
}

impl SystemRuntime for NativeRuntime {
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        fs::read(path).map_err(|e| RuntimeError::at(path, e))
    }

    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        trace!(path = %path.display(), bytes = contents.len(), "Writing file");
        fs::write(path, contents).map_err(|e| RuntimeError::at(path, e))
    }

    /// Stages through a uniquely named temporary file in the destination's
    /// directory; it is removed when the write or the rename fails.
    fn file_write_atomic(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        trace!(path = %path.display(), bytes = contents.len(), "Writing file atomically");

        let mut staged = NamedTempFile::new_in(dir).map_err(|e| RuntimeError::at(dir, e))?;
        staged
            .write_all(contents)
            .map_err(|e| RuntimeError::at(staged.path(), e))?;
        staged
            .persist(path)
            .map_err(|e| RuntimeError::at(path, e.error))?;
        Ok(())
    }

    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            // A path under a regular file (ENOTDIR) simply does not exist
            Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => return Ok(false),
            Err(e) => return Err(RuntimeError::at(path, e)),
        };

        Ok(match kind {
            None => true,
            Some(PathKind::File) => metadata.is_file(),
            Some(PathKind::Directory) => metadata.is_dir(),
        })
    }

    fn path_rename(&self, old: &Path, new: &Path) -> RuntimeResult<()> {
        fs::rename(old, new).map_err(|e| RuntimeError::at(new, e))
    }

    fn file_remove(&self, path: &Path) -> RuntimeResult<()> {
        fs::remove_file(path).map_err(|e| RuntimeError::at(path, e))
    }

    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()> {
        let result = if recursive {
            fs::create_dir_all(path)
        } else {
            fs::create_dir(path)
        };
        result.map_err(|e| RuntimeError::at(path, e))
    }

    fn cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(std::env::current_dir()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read() {
        let rt = NativeRuntime::new();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");

        rt.file_write(&path, b"hello").unwrap();
        assert_eq!(rt.file_read(&path).unwrap(), b"hello");
        assert_eq!(rt.file_read_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_read_missing_file_reports_path() {
        let rt = NativeRuntime::new();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.txt");

        let err = rt.file_read(&path).unwrap_err();
        assert!(matches!(err, RuntimeError::PathIo { .. }));
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn test_path_exists_by_kind() {
        let rt = NativeRuntime::new();
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.js");
        std::fs::write(&file, "x").unwrap();

        assert!(rt.is_file(&file).unwrap());
        assert!(!rt.is_dir(&file).unwrap());
        assert!(rt.is_dir(temp.path()).unwrap());
        assert!(!rt.path_exists(&temp.path().join("nope"), None).unwrap());
        // Looking beneath a regular file is not an error
        assert!(!rt.is_file(&file.join("index.js")).unwrap());
    }

    #[test]
    fn test_dir_create_recursive() {
        let rt = NativeRuntime::new();
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");

        rt.dir_create(&nested, true).unwrap();
        assert!(nested.is_dir());
        // Creating it again is fine when recursive
        rt.dir_create(&nested, true).unwrap();
    }

    #[test]
    fn test_file_write_atomic_replaces_contents() {
        let rt = NativeRuntime::new();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.js");

        rt.file_write_atomic(&path, b"first").unwrap();
        rt.file_write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        // No staging file is left behind
        let leftovers: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_file_write_atomic_concurrent_writers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("shared.js");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let rt = NativeRuntime::new();
                    let body = format!("writer {}", i);
                    (0..50)
                        .filter(|_| rt.file_write_atomic(&path, body.as_bytes()).is_err())
                        .count()
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(failures, 0);
        let last = std::fs::read_to_string(&path).unwrap();
        assert!(last.starts_with("writer "));
        let leftovers: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_file_write_atomic_missing_directory_leaves_nothing() {
        let rt = NativeRuntime::new();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing/out.js");

        let err = rt.file_write_atomic(&path, b"x").unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
    }
}
