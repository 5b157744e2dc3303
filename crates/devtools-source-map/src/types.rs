//! Core types for source mapping

use serde::{Deserialize, Serialize};

/// One correspondence point between generated and original text.
///
/// Lines are 1-based and columns are 0-based, as in every source map
/// consumer. The codec never renumbers; it only shifts between this
/// representation and the 0-based deltas of the encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub generated_line: u32,
    pub generated_column: u32,
    pub original_line: u32,
    pub original_column: u32,
    /// Index into the owning document's `sources`
    pub source_index: usize,
    /// Index into the owning document's `names`, when the segment carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_index: Option<usize>,
}

impl MappingEntry {
    /// Create an entry without a name.
    pub fn new(
        generated: (u32, u32),
        original: (u32, u32),
        source_index: usize,
    ) -> Self {
        MappingEntry {
            generated_line: generated.0,
            generated_column: generated.1,
            original_line: original.0,
            original_column: original.1,
            source_index,
            name_index: None,
        }
    }

    /// Ordering key used when a consumer walks mappings in original order.
    pub(crate) fn original_order_key(&self) -> (usize, u32, u32, u32, u32) {
        (
            self.source_index,
            self.original_line,
            self.original_column,
            self.generated_column,
            self.generated_line,
        )
    }

    /// Ordering key for serialization (generated order).
    pub(crate) fn generated_order_key(&self) -> (u32, u32) {
        (self.generated_line, self.generated_column)
    }
}

/// Which comment convention a generated artifact uses for its embedded map.
///
/// Scripts use the single-line `//# ...` form, stylesheets the delimited
/// `/*# ... */` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    #[default]
    Script,
    Style,
}

impl ArtifactKind {
    /// Whether the attachment should use the multi-line comment form.
    pub fn is_multiline(self) -> bool {
        matches!(self, ArtifactKind::Style)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Script => "script",
            ArtifactKind::Style => "style",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_order_key_prefers_source_then_original_position() {
        let a = MappingEntry::new((4, 0), (1, 0), 0);
        let b = MappingEntry::new((1, 0), (2, 0), 0);
        let c = MappingEntry::new((1, 2), (1, 0), 1);

        let mut entries = vec![c, b, a];
        entries.sort_by_key(MappingEntry::original_order_key);
        assert_eq!(entries, vec![a, b, c]);
    }

    #[test]
    fn test_artifact_kind_multiline() {
        assert!(ArtifactKind::Style.is_multiline());
        assert!(!ArtifactKind::Script.is_multiline());
        assert_eq!(ArtifactKind::default(), ArtifactKind::Script);
    }

    #[test]
    fn test_mapping_entry_serialization_skips_missing_name() {
        let entry = MappingEntry::new((1, 0), (1, 0), 0);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("nameIndex"));
        assert!(json.contains("\"generatedLine\":1"));
    }
}
