/*
 * rewrite.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rewrites the embedded source map of a generated artifact so that every
 * source points at a project file the devtools host can serve.
 */

//! Embedded source map rewriting.
//!
//! [`SourceMapRewriter::rewrite`] takes generated text, decodes its embedded
//! map, resolves every source path to a file on disk and re-encodes the map
//! with root-relative paths. Each resolved file becomes a [`FileDescriptor`]
//! that the caller registers once the artifact has been persisted.
//!
//! Resolution results are memoized per rewriter, keyed by the raw source
//! path, so a path that occurs many times in one map is looked up once and
//! always rewrites to the same value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use devtools_source_map::{
    ArtifactKind, MappingEntry, SourceMapDocument, decode_embedded, detect_kind, to_comment,
};
use devtools_system_runtime::SystemRuntime;
use tracing::debug;

use crate::error::Result;
use crate::registry::FileDescriptor;
use crate::resolver::{PathResolver, ResolvedSource};

/// The plugin a rewritten artifact belongs to.
///
/// Every descriptor produced while rewriting is stamped with these fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOwner {
    /// Public URL of the artifact (and of its plugin)
    pub url: String,
    /// Input file of the plugin
    pub tmp: PathBuf,
    /// Where the artifact is written
    pub output: PathBuf,
}

/// Result of rewriting one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    pub kind: ArtifactKind,
    /// Inline comment carrying the rewritten map; empty when the input had none
    pub comment: String,
    /// Files to register once the artifact is persisted
    pub registrations: Vec<FileDescriptor>,
    pub document: Option<SourceMapDocument>,
}

impl RewriteOutcome {
    fn without_map(kind: ArtifactKind) -> Self {
        Self {
            kind,
            comment: String::new(),
            registrations: Vec::new(),
            document: None,
        }
    }

    pub fn has_map(&self) -> bool {
        self.document.is_some()
    }
}

/// Rewrites the embedded map of one artifact.
///
/// A rewriter is cheap to build and holds the resolution memo, so one is
/// created per artifact and dropped afterwards.
pub struct SourceMapRewriter<'a> {
    resolver: PathResolver<'a>,
    owner: ArtifactOwner,
    memo: HashMap<String, ResolvedSource>,
}

impl<'a> SourceMapRewriter<'a> {
    pub fn new(resolver: PathResolver<'a>, owner: ArtifactOwner) -> Self {
        Self {
            resolver,
            owner,
            memo: HashMap::new(),
        }
    }

    /// Convenience constructor over the default resolver.
    pub fn with_candidates(
        runtime: &'a dyn SystemRuntime,
        root_dir: &Path,
        candidates: &[PathBuf],
        owner: ArtifactOwner,
    ) -> Self {
        Self::new(PathResolver::new(runtime, root_dir, candidates), owner)
    }

    /// Rewrite the embedded map of `content`.
    ///
    /// Text without an embedded map yields an empty comment and no
    /// registrations. A map that cannot be decoded, or a source that cannot
    /// be resolved, fails the whole artifact; nothing is registered then.
    pub fn rewrite(&mut self, content: &str) -> Result<RewriteOutcome> {
        let kind = detect_kind(content);
        let Some(mut document) = decode_embedded(content)? else {
            debug!(url = %self.owner.url, "No embedded source map");
            return Ok(RewriteOutcome::without_map(kind));
        };

        let registrations = self.rewrite_sources(&mut document)?;
        document.mappings = Self::rewrite_mappings(&document);
        document.file = Some(format!("/{}", self.owner.url.trim_start_matches('/')));
        document.source_root = Some("/".to_string());

        debug!(
            url = %self.owner.url,
            sources = document.sources.len(),
            mappings = document.mappings.len(),
            "Rewrote source map"
        );

        Ok(RewriteOutcome {
            kind,
            comment: to_comment(&document, kind)?,
            registrations,
            document: Some(document),
        })
    }

    fn resolve(&mut self, raw: &str, source_root: Option<&str>) -> Result<ResolvedSource> {
        if let Some(hit) = self.memo.get(raw) {
            return Ok(hit.clone());
        }
        let resolved = self.resolver.resolve(raw, source_root)?;
        self.memo.insert(raw.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Replace every source with its root-relative form.
    ///
    /// Entries are rewritten in place and never merged, so every mapping's
    /// source index keeps pointing at the same position. A file reached
    /// through several spellings is registered once.
    fn rewrite_sources(&mut self, document: &mut SourceMapDocument) -> Result<Vec<FileDescriptor>> {
        let source_root = document.source_root.clone();
        let mut registrations: Vec<FileDescriptor> = Vec::new();

        for source in document.sources.iter_mut() {
            let resolved = self.resolve(source, source_root.as_deref())?;
            if !registrations.iter().any(|d| d.path == resolved.absolute_path) {
                registrations.push(self.descriptor(&resolved));
            }
            *source = resolved.root_relative();
        }
        Ok(registrations)
    }

    /// Rebuild the mapping list by visiting entries in original order.
    fn rewrite_mappings(document: &SourceMapDocument) -> Vec<MappingEntry> {
        document
            .original_order()
            .into_iter()
            .copied()
            .collect()
    }

    fn descriptor(&self, resolved: &ResolvedSource) -> FileDescriptor {
        FileDescriptor {
            path: resolved.absolute_path.clone(),
            url: resolved.relative_path.clone(),
            src: self.owner.url.clone(),
            tmp: self.owner.tmp.clone(),
            plugin: self.owner.url.clone(),
            output: self.owner.output.clone(),
        }
    }
}
