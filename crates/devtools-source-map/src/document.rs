//! Decoded source map documents
//!
//! A [`SourceMapDocument`] is the v3 source map JSON with its `mappings`
//! string expanded into [`MappingEntry`] values. Fields this crate does not
//! interpret (`x_google_ignoreList`, `debugId`, ...) are kept verbatim so a
//! decode/encode cycle does not lose them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, Result};
use crate::types::MappingEntry;
use crate::vlq::{decode_mappings, encode_mappings};

/// The only source map revision in circulation.
pub const SOURCE_MAP_VERSION: u32 = 3;

/// Wire form of a v3 source map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_root: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A source map with decoded mappings.
///
/// `sources` is index-addressed and may hold duplicates: every entry's
/// `source_index` points into it, so paths are rewritten in place and the
/// list is never reordered or merged.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMapDocument {
    pub file: Option<String>,
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    pub sources_content: Option<Vec<Option<String>>>,
    pub names: Vec<String>,
    pub mappings: Vec<MappingEntry>,
    /// Top-level keys without a dedicated field
    pub extra: Map<String, Value>,
}

impl SourceMapDocument {
    /// Create an empty document for the given target file.
    pub fn new(file: Option<String>) -> Self {
        SourceMapDocument {
            file,
            source_root: None,
            sources: Vec::new(),
            sources_content: None,
            names: Vec::new(),
            mappings: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Parse source map JSON and decode its mappings.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSourceMap = serde_json::from_str(json)?;

        if raw.version != SOURCE_MAP_VERSION {
            return Err(DecodeError::UnsupportedVersion(raw.version));
        }

        let mappings = decode_mappings(&raw.mappings, raw.sources.len(), raw.names.len())?;

        Ok(SourceMapDocument {
            file: raw.file,
            source_root: raw.source_root,
            sources: raw.sources,
            sources_content: raw.sources_content,
            names: raw.names,
            mappings,
            extra: raw.extra,
        })
    }

    /// Serialize back to source map JSON, re-encoding the mappings.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let raw = RawSourceMap {
            version: SOURCE_MAP_VERSION,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: self.encoded_mappings(),
            extra: self.extra.clone(),
        };
        serde_json::to_string(&raw)
    }

    /// The `mappings` string for the current entries.
    pub fn encoded_mappings(&self) -> String {
        encode_mappings(&self.mappings)
    }

    /// Entries sorted the way an original-order traversal visits them:
    /// by source, then original position, then generated position.
    pub fn original_order(&self) -> Vec<&MappingEntry> {
        let mut ordered: Vec<&MappingEntry> = self.mappings.iter().collect();
        ordered.sort_by_key(|entry| entry.original_order_key());
        ordered
    }

    /// The source path an entry refers to.
    pub fn source_of(&self, entry: &MappingEntry) -> Option<&str> {
        self.sources.get(entry.source_index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 3,
        "file": "bundle.js",
        "sourceRoot": "",
        "sources": ["../src/a.js", "../src/b.js"],
        "names": ["foo"],
        "mappings": "AAAA,QAAQ;ACEN",
        "x_google_ignoreList": [1]
    }"#;

    #[test]
    fn test_from_json_decodes_mappings() {
        let doc = SourceMapDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.file.as_deref(), Some("bundle.js"));
        assert_eq!(doc.source_root.as_deref(), Some(""));
        assert_eq!(doc.sources, vec!["../src/a.js", "../src/b.js"]);
        assert_eq!(doc.mappings.len(), 3);
        assert_eq!(doc.source_of(&doc.mappings[2]), Some("../src/b.js"));
    }

    #[test]
    fn test_from_json_rejects_other_versions() {
        let err = SourceMapDocument::from_json(r#"{"version": 2, "sources": [], "mappings": ""}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_from_json_rejects_malformed_json() {
        let err = SourceMapDocument::from_json("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_to_json_preserves_unknown_keys() {
        let doc = SourceMapDocument::from_json(SAMPLE).unwrap();
        let json = doc.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 3);
        assert_eq!(value["mappings"], "AAAA,QAAQ;ACEN");
        assert_eq!(value["x_google_ignoreList"], serde_json::json!([1]));
        assert_eq!(value["names"], serde_json::json!(["foo"]));
        assert!(value.get("sourcesContent").is_none());
    }

    #[test]
    fn test_round_trip_keeps_correspondences() {
        let doc = SourceMapDocument::from_json(SAMPLE).unwrap();
        let again = SourceMapDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn test_original_order() {
        let doc = SourceMapDocument::from_json(
            r#"{"version":3,"sources":["a.js","b.js"],"names":[],"mappings":"ACEA,CDCC;AAAA"}"#,
        )
        .unwrap();

        let order: Vec<(usize, u32, u32)> = doc
            .original_order()
            .into_iter()
            .map(|e| (e.source_index, e.original_line, e.generated_line))
            .collect();
        // Same original position on source 0: the lower generated column wins
        assert_eq!(order, vec![(0, 4, 2), (0, 4, 1), (1, 3, 1)]);
    }
}
