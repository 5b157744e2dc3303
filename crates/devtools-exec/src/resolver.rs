/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Maps the source paths found in a generated map to files on disk.
 */

//! Source path resolution.
//!
//! A bundler writes source paths relative to wherever it happened to run,
//! so a path like `../src/app.js` is tried against each candidate directory
//! in order. For every candidate the lookup mirrors module resolution: the
//! exact file, the file with a known extension appended, then the directory
//! (its `package.json` `main` entry or an `index` file).
//!
//! The result is expressed relative to the candidate it was found under,
//! which is what viewers use as the public path of the source.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use devtools_system_runtime::{PathKind, SystemRuntime};
use tracing::{debug, warn};

use crate::error::ResolutionError;

/// Extensions tried, in order, when the exact path is not a file.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "json", "node", "mjs", "css"];

/// A source path matched to a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Absolute path of the matching file
    pub absolute_path: PathBuf,
    /// `/`-separated path relative to the candidate directory, no leading separator
    pub relative_path: String,
}

impl ResolvedSource {
    /// The root-relative form written into rewritten maps (`/src/app.js`).
    pub fn root_relative(&self) -> String {
        format!("/{}", self.relative_path)
    }
}

/// Resolves source paths against an ordered list of candidate directories.
pub struct PathResolver<'a> {
    runtime: &'a dyn SystemRuntime,
    root_dir: PathBuf,
    candidates: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver searching `candidates` in order.
    ///
    /// `root_dir` is the project root; source paths that already carry it as
    /// a prefix are searched by their remainder.
    pub fn new(runtime: &'a dyn SystemRuntime, root_dir: &Path, candidates: &[PathBuf]) -> Self {
        Self {
            runtime,
            root_dir: normalize_path(root_dir),
            candidates: candidates.iter().map(|c| normalize_path(c)).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Replace the extension list.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Resolve a source path taken from a map whose `sourceRoot` is `source_root`.
    pub fn resolve(
        &self,
        raw: &str,
        source_root: Option<&str>,
    ) -> Result<ResolvedSource, ResolutionError> {
        let request = self.prepare_request(raw, source_root);
        let bases = self.search_bases(request);

        for base in &bases {
            if let Some(found) = self.find_path(base, request.ends_with('/')) {
                let relative_path = self.relativize(&found);
                debug!(
                    source = raw,
                    path = %found.display(),
                    relative = %relative_path,
                    "Resolved source"
                );
                return Ok(ResolvedSource {
                    absolute_path: found,
                    relative_path,
                });
            }
        }

        Err(ResolutionError {
            request: raw.to_string(),
            searched: bases,
        })
    }

    /// Strip the map's `sourceRoot` and the project root from a source path.
    ///
    /// Running the result through here again is a no-op.
    fn prepare_request<'r>(&self, raw: &'r str, source_root: Option<&str>) -> &'r str {
        let mut request = raw;
        if let Some(root) = source_root.filter(|r| !r.is_empty()) {
            request = request.strip_prefix(root).unwrap_or(request);
        }
        let root_prefix = format!("{}/", to_slash(&self.root_dir).trim_end_matches('/'));
        request.strip_prefix(root_prefix.as_str()).unwrap_or(request)
    }

    fn search_bases(&self, request: &str) -> Vec<PathBuf> {
        let request_path = Path::new(request);
        if request_path.is_absolute() {
            return vec![normalize_path(request_path)];
        }
        self.candidates
            .iter()
            .map(|dir| normalize_path(&dir.join(request_path)))
            .collect()
    }

    fn find_path(&self, base: &Path, trailing_slash: bool) -> Option<PathBuf> {
        if !trailing_slash {
            if let Some(found) = self.try_file(base).or_else(|| self.try_extensions(base)) {
                return Some(found);
            }
        }
        self.try_directory(base)
    }

    fn try_file(&self, path: &Path) -> Option<PathBuf> {
        self.probe(path, PathKind::File).then(|| path.to_path_buf())
    }

    fn try_extensions(&self, base: &Path) -> Option<PathBuf> {
        self.extensions.iter().find_map(|ext| {
            let mut name = OsString::from(base.as_os_str());
            name.push(".");
            name.push(ext);
            self.try_file(Path::new(&name))
        })
    }

    fn try_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !self.probe(dir, PathKind::Directory) {
            return None;
        }
        if let Some(main) = self.package_main(dir) {
            let entry = normalize_path(&dir.join(main));
            let found = self
                .try_file(&entry)
                .or_else(|| self.try_extensions(&entry))
                .or_else(|| self.try_extensions(&entry.join("index")));
            if found.is_some() {
                return found;
            }
        }
        self.try_extensions(&dir.join("index"))
    }

    /// The `main` field of `dir/package.json`, if there is one.
    fn package_main(&self, dir: &Path) -> Option<String> {
        let manifest = dir.join("package.json");
        if !self.probe(&manifest, PathKind::File) {
            return None;
        }
        let text = match self.runtime.file_read_string(&manifest) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %manifest.display(), error = %e, "Unreadable package.json");
                return None;
            }
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) => value
                .get("main")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            Err(e) => {
                warn!(path = %manifest.display(), error = %e, "Malformed package.json");
                None
            }
        }
    }

    /// Existence probe; a probe that fails counts as "not there".
    fn probe(&self, path: &Path, kind: PathKind) -> bool {
        match self.runtime.path_exists(path, Some(kind)) {
            Ok(exists) => exists,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Probe failed");
                false
            }
        }
    }

    /// Express `found` relative to the deepest candidate containing it.
    fn relativize(&self, found: &Path) -> String {
        let base = self
            .candidates
            .iter()
            .chain(std::iter::once(&self.root_dir))
            .filter(|dir| found.starts_with(dir))
            .max_by_key(|dir| dir.components().count());

        let relative = match base {
            Some(dir) => found.strip_prefix(dir).unwrap_or(found),
            None => found,
        };
        to_slash(relative).trim_start_matches('/').to_string()
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Render a path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
