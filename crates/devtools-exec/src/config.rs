/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Exec plugin options and the values derived from them.
 */

//! Configuration for an exec plugin.
//!
//! Options come from two places: the plugin's own `[exec]` section and the
//! `[devtools]` section supplied by the host (where artifacts are written and
//! which directory holds the project's sources).
//!
//! ```toml
//! [exec]
//! src = "src/app.js"
//! url = "app.js"
//! useSourceStream = false
//!
//! [devtools]
//! destination = ".devtools/out"
//! directory = ".devtools/tmp"
//! ```

use std::path::{Path, PathBuf};

use devtools_system_runtime::SystemRuntime;
use serde::{Deserialize, Serialize};

use crate::error::{ExecError, Result};
use crate::resolver::normalize_path;
use crate::stream::StreamMode;

/// Options of one exec plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOptions {
    /// Input file handed to the build command
    pub src: String,
    /// Public URL path of the artifact; defaults to `src`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Project root; defaults to the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub use_source_stream: bool,
}

/// Options supplied by the devtools host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevtoolsOptions {
    /// Directory artifacts are written to
    pub destination: PathBuf,
    /// Directory searched for sources after the project root
    pub directory: PathBuf,
}

/// Both configuration sections, as read from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecConfig {
    pub exec: ExecOptions,
    pub devtools: DevtoolsOptions,
}

impl ExecConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ExecError::Config(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ExecError::Config(e.to_string()))
    }

    /// Load a `.json` or `.toml` configuration file.
    pub fn load(runtime: &dyn SystemRuntime, path: &Path) -> Result<Self> {
        let text = runtime.file_read_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }
}

/// Values derived once from the options, with every path absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSettings {
    /// Absolute path of the input file
    pub src: PathBuf,
    pub url: String,
    pub root_dir: PathBuf,
    pub source_dir: PathBuf,
    /// Where the artifact is written: `destination/url`
    pub output_path: PathBuf,
    pub mode: StreamMode,
}

impl ExecSettings {
    pub fn derive(exec: &ExecOptions, devtools: &DevtoolsOptions, cwd: &Path) -> Result<Self> {
        if exec.src.trim().is_empty() {
            return Err(ExecError::Config("`src` must not be empty".to_string()));
        }

        let absolute = |path: &Path| normalize_path(&cwd.join(path));
        let url = exec.url.clone().unwrap_or_else(|| exec.src.clone());
        let output_path = absolute(&devtools.destination.join(url.trim_start_matches('/')));

        Ok(Self {
            src: absolute(Path::new(&exec.src)),
            root_dir: exec.root.as_deref().map_or_else(|| normalize_path(cwd), absolute),
            source_dir: absolute(&devtools.directory),
            output_path,
            url,
            mode: StreamMode::from_use_source_stream(exec.use_source_stream),
        })
    }

    /// Directories source paths are resolved against, in order.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        vec![self.root_dir.clone(), self.source_dir.clone()]
    }
}
