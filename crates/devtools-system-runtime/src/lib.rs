/*
 * devtools-system-runtime
 * Copyright (c) 2025 Posit, PBC
 *
 * Runtime abstraction layer for the devtools exec pipeline.
 *
 * This crate provides a trait-based abstraction for the filesystem
 * operations the pipeline performs (reading generated input, probing
 * candidate source paths, creating output directories, writing artifacts):
 *
 * - NativeRuntime: Full filesystem access using std
 * - SharedRuntime: the reference-counted handle pipelines pass around
 */

mod native;
mod traits;

use std::sync::Arc;

pub use native::NativeRuntime;
pub use traits::{PathKind, RuntimeError, RuntimeResult, SystemRuntime, staging_path};

/// Handle through which independent exec pipelines share one runtime.
pub type SharedRuntime = Arc<dyn SystemRuntime>;

/// The runtime used outside of tests.
pub fn default_runtime() -> NativeRuntime {
    NativeRuntime::new()
}
