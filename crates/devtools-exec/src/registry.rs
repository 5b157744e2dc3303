//! Registry of files the devtools host serves and watches
//!
//! Shared by every exec plugin of a host. Entries are keyed by absolute path:
//! the first registration of a path fixes its identity, later registrations
//! only refresh the descriptive fields. A target may also carry a transient
//! payload that is consumed by the next change record built for it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A file known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Public URL path (no leading `/`)
    pub url: String,
    /// Identifier of the owning target, used as the change record's event
    pub src: String,
    /// Input file of the owning plugin
    pub tmp: PathBuf,
    /// Public URL of the owning plugin
    pub plugin: String,
    /// Artifact written by the owning plugin
    pub output: PathBuf,
}

/// Outcome of [`FileRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    Updated,
}

#[derive(Debug, Default)]
struct RegistryState {
    files: Vec<FileDescriptor>,
    index: HashMap<PathBuf, usize>,
    pending: HashMap<PathBuf, String>,
}

/// Thread-safe, cloneable handle to the shared registry.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh a descriptor.
    pub fn register(&self, descriptor: FileDescriptor) -> Registration {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Self::insert(&mut state, descriptor)
    }

    /// Register several descriptors under one lock.
    ///
    /// Readers observe either none or all of them.
    pub fn register_all(&self, descriptors: impl IntoIterator<Item = FileDescriptor>) -> usize {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        descriptors
            .into_iter()
            .map(|descriptor| Self::insert(&mut state, descriptor))
            .filter(|r| *r == Registration::Added)
            .count()
    }

    fn insert(state: &mut RegistryState, descriptor: FileDescriptor) -> Registration {
        match state.index.get(&descriptor.path) {
            Some(&i) => {
                debug!(path = %descriptor.path.display(), "Refreshing registered file");
                state.files[i] = descriptor;
                Registration::Updated
            }
            None => {
                debug!(path = %descriptor.path.display(), url = %descriptor.url, "Registering file");
                state.index.insert(descriptor.path.clone(), state.files.len());
                state.files.push(descriptor);
                Registration::Added
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<FileDescriptor> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.index.get(path).map(|&i| state.files[i].clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.index.contains_key(path)
    }

    /// Snapshot of every descriptor, in registration order.
    pub fn descriptors(&self) -> Vec<FileDescriptor> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.files.clone()
    }

    /// Descriptors owned by the plugin published at `plugin`.
    pub fn owned_by(&self, plugin: &str) -> Vec<FileDescriptor> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .files
            .iter()
            .filter(|d| d.plugin == plugin)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach a transient payload to a registered target.
    ///
    /// Returns `false` (and stores nothing) when `path` is not registered.
    pub fn attach_content(&self, path: &Path, content: impl Into<String>) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !state.index.contains_key(path) {
            return false;
        }
        state.pending.insert(path.to_path_buf(), content.into());
        true
    }

    /// Consume the transient payload of `path`, if any.
    pub fn take_content(&self, path: &Path) -> Option<String> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.pending.remove(path)
    }
}
