//! devtools-exec - source-mapped build output for live devtools views
//!
//! An exec plugin runs an external build command, takes the generated
//! scripts and stylesheets it produces, and rewrites their embedded source
//! maps so every source points at a project file the devtools host serves.
//! The rewritten artifact is written to the host's output directory and
//! announced to connected viewers.
//!
//! # Modules
//!
//! - [`resolver`]: maps source paths from a map to files on disk
//! - [`registry`]: the host's shared table of served files
//! - [`rewrite`]: decodes, rewrites and re-encodes an embedded map
//! - [`persist`]: writes artifacts and builds change records
//! - [`stream`]: adapters between the build command and artifacts
//! - [`plugin`]: the exec plugin driver
//! - [`config`]: plugin options

pub mod config;
pub mod error;
pub mod persist;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod rewrite;
pub mod stream;

pub use config::{DevtoolsOptions, ExecConfig, ExecOptions, ExecSettings};
pub use error::{ExecError, ResolutionError, Result};
pub use persist::{ChangeAction, ChangeRecord, ChangeTarget, DevtoolsHost, TracingHost};
pub use plugin::{BuildCommand, ExecFile, ExecPlugin, RunSummary};
pub use registry::{FileDescriptor, FileRegistry, Registration};
pub use resolver::{PathResolver, ResolvedSource};
pub use rewrite::{ArtifactOwner, RewriteOutcome, SourceMapRewriter};
pub use stream::{CommandInput, SourceChunk, StreamMode};
