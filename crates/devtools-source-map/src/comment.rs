//! Inline `sourceMappingURL` comments
//!
//! Generated scripts end with `//# sourceMappingURL=data:...` and generated
//! stylesheets with `/*# sourceMappingURL=data:... */`. Only `data:` URIs are
//! considered embedded maps; a comment pointing at an external `.map` file is
//! treated as if no map were present.

use std::borrow::Cow;
use std::ops::Range;

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::SourceMapDocument;
use crate::error::{DecodeError, Result};
use crate::types::ArtifactKind;

static MAP_COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*/([/*])[@#][ \t]+sourceMappingURL=data:(?:application|text)/json(?:;charset[:=][^;,\s]+)?(;base64)?,(.*)$",
    )
    .unwrap()
});

/// Producers are inconsistent about trailing `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const DATA_URI_PREFIX: &str = "sourceMappingURL=data:application/json;charset=utf-8;base64,";

/// An embedded map comment located in generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedComment<'a> {
    /// Comment convention, taken from the comment's own delimiter
    pub kind: ArtifactKind,
    /// Byte range of the whole comment line (without its line terminator)
    pub span: Range<usize>,
    /// Whether the payload is base64 encoded
    pub base64: bool,
    /// Raw payload after the comma, with any `*/` terminator removed
    pub payload: &'a str,
}

impl EmbeddedComment<'_> {
    /// Decode the payload into JSON text.
    pub fn json(&self) -> Result<String> {
        if self.base64 {
            let compact: String = self
                .payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            let bytes = LENIENT_BASE64.decode(compact)?;
            Ok(String::from_utf8(bytes)?)
        } else {
            percent_decode(self.payload)
        }
    }

    /// Decode the payload into a document.
    pub fn decode(&self) -> Result<SourceMapDocument> {
        SourceMapDocument::from_json(&self.json()?)
    }
}

/// Undo URI percent escapes; a `%` not followed by two hex digits is an error.
fn percent_decode(payload: &str) -> Result<String> {
    if !payload.contains('%') {
        return Ok(payload.to_string());
    }

    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let byte = payload
            .get(i + 1..i + 3)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .ok_or(DecodeError::PercentEscape { offset: i })?;
        out.push(byte);
        i += 3;
    }
    Ok(String::from_utf8(out)?)
}

/// Find the embedded map comment in generated text.
///
/// When several are present the last one wins, matching what browsers do.
pub fn find_embedded(content: &str) -> Option<EmbeddedComment<'_>> {
    let captures = MAP_COMMENT_RE.captures_iter(content).last()?;
    let whole = captures.get(0)?;

    let kind = match captures.get(1).map(|m| m.as_str()) {
        Some("*") => ArtifactKind::Style,
        _ => ArtifactKind::Script,
    };

    let mut payload = captures.get(3).map_or("", |m| m.as_str()).trim_end();
    if kind == ArtifactKind::Style {
        payload = payload.strip_suffix("*/").unwrap_or(payload).trim_end();
    }

    Some(EmbeddedComment {
        kind,
        span: whole.range(),
        base64: captures.get(2).is_some(),
        payload,
    })
}

/// Detect the artifact kind of generated text.
///
/// Text without an embedded map is treated as a script.
pub fn detect_kind(content: &str) -> ArtifactKind {
    find_embedded(content).map_or(ArtifactKind::Script, |comment| comment.kind)
}

/// Decode the embedded map of generated text.
///
/// Returns `Ok(None)` when the text carries no embedded map; a map that is
/// present but unreadable is an error.
pub fn decode_embedded(content: &str) -> Result<Option<SourceMapDocument>> {
    match find_embedded(content) {
        Some(comment) => comment.decode().map(Some),
        None => Ok(None),
    }
}

/// Strip every embedded map comment from generated text.
pub fn remove_comments(content: &str) -> Cow<'_, str> {
    MAP_COMMENT_RE.replace_all(content, "")
}

/// Render a document as an inline comment in the convention of `kind`.
pub fn to_comment(document: &SourceMapDocument, kind: ArtifactKind) -> serde_json::Result<String> {
    let encoded = STANDARD.encode(document.to_json()?);
    Ok(match kind {
        ArtifactKind::Style => format!("/*# {}{} */", DATA_URI_PREFIX, encoded),
        ArtifactKind::Script => format!("//# {}{}", DATA_URI_PREFIX, encoded),
    })
}
