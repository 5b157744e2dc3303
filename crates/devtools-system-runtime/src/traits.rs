/*
 * traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Defines the SystemRuntime trait and supporting types for the runtime abstraction layer.
 *
 * The exec pipeline never touches std::fs directly; every read, write,
 * existence probe and directory creation goes through this trait so that
 * path resolution and persistence can be exercised against any backend.
 */

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of a filesystem operation.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// A failed filesystem operation.
#[derive(Debug)]
pub enum RuntimeError {
    /// Standard I/O error
    Io(io::Error),

    /// I/O error tied to a specific path
    PathIo {
        /// The path being operated on
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },
}

impl RuntimeError {
    /// Attach the path an I/O error happened on.
    pub fn at(path: &Path, source: io::Error) -> Self {
        RuntimeError::PathIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::Io(e) => write!(f, "filesystem error: {}", e),
            RuntimeError::PathIo { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuntimeError::Io(e) => Some(e),
            RuntimeError::PathIo { source, .. } => Some(source),
        }
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        RuntimeError::Io(e)
    }
}

/// What an existence probe looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Trait defining the filesystem operations the pipeline relies on.
///
/// Implementations must be `Send + Sync`: independent artifact pipelines may
/// share one runtime.
pub trait SystemRuntime: Send + Sync {
    // Files

    /// Read generated input or a configuration file.
    fn file_read(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Read a UTF-8 text file.
    fn file_read_string(&self, path: &Path) -> RuntimeResult<String> {
        let bytes = self.file_read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            RuntimeError::at(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("not UTF-8 text: {}", e),
                ),
            )
        })
    }

    /// Create or truncate `path` and write `contents`.
    fn file_write(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()>;

    /// Write bytes so that readers see either the old or the new contents.
    ///
    /// Default implementation writes a sibling temporary file, unique to
    /// this call, and renames it over the destination.
    fn file_write_atomic(&self, path: &Path, contents: &[u8]) -> RuntimeResult<()> {
        let tmp = staging_path(path);
        let result = self
            .file_write(&tmp, contents)
            .and_then(|()| self.path_rename(&tmp, path));
        if result.is_err() {
            // Best effort cleanup - the original error is what matters
            let _ = self.file_remove(&tmp);
        }
        result
    }

    /// Probe `path`; with a `kind`, only a path of that kind counts.
    ///
    /// A missing path is `Ok(false)`, not an error.
    fn path_exists(&self, path: &Path, kind: Option<PathKind>) -> RuntimeResult<bool>;

    /// Probe for a regular file.
    fn is_file(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::File))
    }

    /// Probe for a directory.
    fn is_dir(&self, path: &Path) -> RuntimeResult<bool> {
        self.path_exists(path, Some(PathKind::Directory))
    }

    /// Move `old` over `new`, replacing it.
    fn path_rename(&self, old: &Path, new: &Path) -> RuntimeResult<()>;

    /// Remove a file.
    fn file_remove(&self, path: &Path) -> RuntimeResult<()>;

    // Directories

    /// Create a directory; `recursive` also creates missing parents.
    fn dir_create(&self, path: &Path, recursive: bool) -> RuntimeResult<()>;

    /// Directory relative configuration paths resolve against.
    fn cwd(&self) -> RuntimeResult<PathBuf>;
}

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sibling path used to stage an atomic write.
///
/// `/out/app.js` stages through `/out/.app.js.<pid>.<n>.tmp`, so the rename
/// never crosses a filesystem boundary. Every call returns a fresh name.
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::at(
            Path::new("/out/app.js"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/out/app.js"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_runtime_error_source() {
        use std::error::Error;

        let err = RuntimeError::from(io::Error::other("boom"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "filesystem error: boom");
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let staged = staging_path(Path::new("/out/dir/app.js"));
        assert_eq!(staged.parent(), Some(Path::new("/out/dir")));
        let name = staged.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".app.js."));
        assert!(name.ends_with(".tmp"));
    }

    #[test]
    fn test_staging_path_differs_per_call() {
        let path = Path::new("/out/app.js");
        assert_ne!(staging_path(path), staging_path(path));
    }
}
