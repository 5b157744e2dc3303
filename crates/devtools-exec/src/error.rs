//! Error types for devtools-exec

use std::path::PathBuf;

use devtools_source_map::DecodeError;
use devtools_system_runtime::RuntimeError;

/// A source path that matched no file under any candidate directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot resolve source '{request}' (searched: {})", display_searched(.searched))]
pub struct ResolutionError {
    /// The source path as it appeared in the map
    pub request: String,
    /// Every base path that was probed
    pub searched: Vec<PathBuf>,
}

fn display_searched(searched: &[PathBuf]) -> String {
    if searched.is_empty() {
        return "nothing".to_string();
    }
    searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Malformed embedded source map: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("Failed to encode source map: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Build command failed: {0}")]
    Build(String),

    #[error("Invalid exec configuration: {0}")]
    Config(String),

    #[error("Build output is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_lists_searched_paths() {
        let err = ResolutionError {
            request: "../src/missing.js".to_string(),
            searched: vec![
                PathBuf::from("/src/missing.js"),
                PathBuf::from("/project/src/missing.js"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("'../src/missing.js'"));
        assert!(msg.contains("/src/missing.js, /project/src/missing.js"));
    }

    #[test]
    fn test_exec_error_wraps_resolution_transparently() {
        let err: ExecError = ResolutionError {
            request: "a.js".to_string(),
            searched: vec![],
        }
        .into();
        assert_eq!(err.to_string(), "Cannot resolve source 'a.js' (searched: nothing)");
    }
}
