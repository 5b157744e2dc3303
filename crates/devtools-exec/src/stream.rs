//! Adapters between the build command and whole artifacts
//!
//! In whole-file mode the command receives the input file as a one-item
//! channel and replies with one complete artifact per item it sends. In
//! streamed mode it receives only the input path and writes arbitrary chunks
//! that are joined into a single artifact once its sender is dropped.

use std::path::{Path, PathBuf};

use devtools_system_runtime::SystemRuntime;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{ExecError, Result};

/// Written in place of an artifact the command produced empty.
pub const EMPTY_ARTIFACT: &str = "/** empty **/";

/// How the build command is fed and how its output is delimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamMode {
    /// One input item in, complete artifacts out
    #[default]
    WholeFile,
    /// Input path in, chunked output joined into one artifact
    Streamed,
}

impl StreamMode {
    pub fn from_use_source_stream(use_source_stream: bool) -> Self {
        if use_source_stream {
            StreamMode::Streamed
        } else {
            StreamMode::WholeFile
        }
    }
}

/// One input file as handed to the build command in whole-file mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChunk {
    pub path: PathBuf,
    pub cwd: PathBuf,
    pub contents: Vec<u8>,
}

/// What the build command reads from.
#[derive(Debug)]
pub enum CommandInput {
    /// Streamed mode: the command opens the input itself
    Path(PathBuf),
    /// Whole-file mode: exactly one chunk, then the channel closes
    Files(mpsc::Receiver<SourceChunk>),
}

/// Read `path` into a channel that yields it once and then ends.
pub fn read_to_stream(runtime: &dyn SystemRuntime, path: &Path) -> Result<mpsc::Receiver<SourceChunk>> {
    let contents = runtime.file_read(path)?;
    let cwd = runtime.cwd()?;

    let (tx, rx) = mpsc::channel(1);
    tx.try_send(SourceChunk {
        path: path.to_path_buf(),
        cwd,
        contents,
    })
    .map_err(|e| ExecError::Build(format!("Failed to queue input file: {}", e)))?;
    Ok(rx)
}

/// Join every chunk sent on `rx`, in arrival order, until the sender is dropped.
pub async fn stream_to_content(mut rx: mpsc::Receiver<Vec<u8>>) -> Result<String> {
    let mut buffer = Vec::new();
    while let Some(chunk) = rx.recv().await {
        buffer.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8(buffer)?)
}

/// Decode one whole-file artifact, substituting the placeholder for empty output.
pub fn artifact_content(bytes: Vec<u8>) -> Result<String> {
    if bytes.is_empty() {
        return Ok(EMPTY_ARTIFACT.to_string());
    }
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtools_system_runtime::NativeRuntime;
    use tempfile::TempDir;

    #[test]
    fn test_stream_mode_from_flag() {
        assert_eq!(StreamMode::from_use_source_stream(false), StreamMode::WholeFile);
        assert_eq!(StreamMode::from_use_source_stream(true), StreamMode::Streamed);
        assert_eq!(StreamMode::default(), StreamMode::WholeFile);
    }

    #[tokio::test]
    async fn test_read_to_stream_yields_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("input.js");
        std::fs::write(&path, "import './a.js';").unwrap();

        let mut rx = read_to_stream(&NativeRuntime::new(), &path).unwrap();
        let chunk = rx.recv().await.unwrap();
        assert_eq!(chunk.path, path);
        assert_eq!(chunk.contents, b"import './a.js';");
        assert!(chunk.cwd.is_absolute());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_read_to_stream_missing_input() {
        let temp = TempDir::new().unwrap();
        let err = read_to_stream(&NativeRuntime::new(), &temp.path().join("nope.js")).unwrap_err();
        assert!(matches!(err, ExecError::Runtime(_)));
    }

    #[tokio::test]
    async fn test_stream_to_content_joins_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let collector = tokio::spawn(stream_to_content(rx));

        for chunk in ["con", "sole.log(1);", "\n"] {
            tx.send(chunk.as_bytes().to_vec()).await.unwrap();
        }
        drop(tx);

        assert_eq!(collector.await.unwrap().unwrap(), "console.log(1);\n");
    }

    #[tokio::test]
    async fn test_stream_to_content_multibyte_across_chunks() {
        let bytes = "é".as_bytes();
        let (tx, rx) = mpsc::channel(2);
        tx.send(vec![bytes[0]]).await.unwrap();
        tx.send(vec![bytes[1]]).await.unwrap();
        drop(tx);

        assert_eq!(stream_to_content(rx).await.unwrap(), "é");
    }

    #[tokio::test]
    async fn test_stream_to_content_invalid_utf8() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(vec![0xff, 0xfe]).await.unwrap();
        drop(tx);

        let err = stream_to_content(rx).await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidUtf8(_)));
    }

    #[test]
    fn test_artifact_content_placeholder() {
        assert_eq!(artifact_content(Vec::new()).unwrap(), EMPTY_ARTIFACT);
        assert_eq!(artifact_content(b"a();".to_vec()).unwrap(), "a();");
    }
}
