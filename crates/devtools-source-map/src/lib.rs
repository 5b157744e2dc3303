//! Source maps embedded in generated build output
//!
//! This crate reads the inline `sourceMappingURL` comment that bundlers and
//! style compilers append to their output, decodes it into a
//! [`SourceMapDocument`], and renders a document back into an inline comment.
//!
//! # Overview
//!
//! The core types are:
//! - [`SourceMapDocument`]: a v3 source map with decoded mappings
//! - [`MappingEntry`]: one generated-to-original correspondence
//! - [`ArtifactKind`]: script (`//#`) or style (`/*# */`) comment convention
//!
//! # Example
//!
//! ```rust
//! use devtools_source_map::*;
//!
//! let generated = "a();\n//# sourceMappingURL=data:application/json;base64,\
//!     eyJ2ZXJzaW9uIjozLCJzb3VyY2VzIjpbImEuanMiXSwibWFwcGluZ3MiOiJBQUFBIn0=";
//!
//! let doc = decode_embedded(generated).unwrap().unwrap();
//! assert_eq!(doc.sources, vec!["a.js"]);
//! assert_eq!(doc.mappings[0], MappingEntry::new((1, 0), (1, 0), 0));
//!
//! let comment = to_comment(&doc, detect_kind(generated)).unwrap();
//! assert!(comment.starts_with("//# sourceMappingURL="));
//! ```

pub mod comment;
pub mod document;
pub mod error;
pub mod types;
pub mod vlq;

// Re-export main types
pub use comment::{
    EmbeddedComment, decode_embedded, detect_kind, find_embedded, remove_comments, to_comment,
};
pub use document::{SOURCE_MAP_VERSION, SourceMapDocument};
pub use error::{DecodeError, Result};
pub use types::{ArtifactKind, MappingEntry};
pub use vlq::{decode_mappings, encode_mappings};
