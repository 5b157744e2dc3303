//! Base64 VLQ codec for the `mappings` field
//!
//! Every segment is a run of VLQ values relative to the previous segment:
//! the generated column resets on each `;` line break, while source index,
//! original line, original column and name index carry across lines.

use crate::error::{DecodeError, Result};
use crate::types::MappingEntry;

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const VLQ_BASE_SHIFT: u32 = 5;
const VLQ_BASE: i64 = 1 << VLQ_BASE_SHIFT;
const VLQ_BASE_MASK: i64 = VLQ_BASE - 1;
const VLQ_CONTINUATION_BIT: i64 = VLQ_BASE;

/// Largest shift that still leaves a full digit inside an i64.
const MAX_SHIFT: u32 = 55;

fn digit_value(byte: u8) -> Option<i64> {
    let value = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(i64::from(value))
}

/// Append the VLQ encoding of `value` to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = vlq & VLQ_BASE_MASK;
        vlq >>= VLQ_BASE_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION_BIT;
        }
        out.push(char::from(BASE64_DIGITS[digit as usize]));
        if vlq == 0 {
            break;
        }
    }
}

/// Decode every VLQ value in one segment.
///
/// `base` is the byte offset of the segment inside the whole mappings
/// string and is only used for error positions.
pub fn decode_segment(segment: &str, base: usize) -> Result<Vec<i64>> {
    let bytes = segment.as_bytes();
    let mut values = Vec::with_capacity(5);
    let mut i = 0;

    while i < bytes.len() {
        let mut accumulated: i64 = 0;
        let mut shift = 0u32;

        loop {
            let Some(&byte) = bytes.get(i) else {
                return Err(DecodeError::UnterminatedVlq { offset: base + i });
            };
            let Some(digit) = digit_value(byte) else {
                // Everything before `i` was ASCII, so `i` is a char boundary.
                let digit = segment[i..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                return Err(DecodeError::InvalidVlqDigit {
                    digit,
                    offset: base + i,
                });
            };
            if shift > MAX_SHIFT {
                return Err(DecodeError::VlqOverflow { offset: base + i });
            }
            i += 1;

            accumulated += (digit & VLQ_BASE_MASK) << shift;
            shift += VLQ_BASE_SHIFT;

            if digit & VLQ_CONTINUATION_BIT == 0 {
                break;
            }
        }

        let magnitude = accumulated >> 1;
        values.push(if accumulated & 1 == 1 {
            -magnitude
        } else {
            magnitude
        });
    }

    Ok(values)
}

fn to_u32(value: i64, line: usize, field: &'static str, offset: usize) -> Result<u32> {
    if value < 0 {
        return Err(DecodeError::NegativePosition { line, field });
    }
    u32::try_from(value).map_err(|_| DecodeError::VlqOverflow { offset })
}

/// Decode a `mappings` string into entries, in the order they appear.
///
/// Segments that carry only a generated column do not correspond to any
/// original position and are skipped, although their column delta still
/// counts toward the following segments.
pub fn decode_mappings(
    mappings: &str,
    sources_len: usize,
    names_len: usize,
) -> Result<Vec<MappingEntry>> {
    let mut entries = Vec::new();

    let mut source: i64 = 0;
    let mut original_line: i64 = 0;
    let mut original_column: i64 = 0;
    let mut name: i64 = 0;

    let mut offset = 0usize;

    for (line_index, line_text) in mappings.split(';').enumerate() {
        let line = line_index + 1;
        let mut generated_column: i64 = 0;

        for segment in line_text.split(',') {
            let segment_offset = offset;
            // Account for the ',' or ';' that follows the segment
            offset += segment.len() + 1;

            if segment.is_empty() {
                continue;
            }

            let fields = decode_segment(segment, segment_offset)?;
            generated_column += fields[0];
            let column = to_u32(generated_column, line, "generated column", segment_offset)?;

            match fields.len() {
                1 => continue,
                4 | 5 => {}
                n => return Err(DecodeError::InvalidSegment { line, fields: n }),
            }

            source += fields[1];
            original_line += fields[2];
            original_column += fields[3];

            if source < 0 || source as usize >= sources_len {
                return Err(DecodeError::SourceOutOfRange {
                    line,
                    index: source,
                    len: sources_len,
                });
            }

            let name_index = if fields.len() == 5 {
                name += fields[4];
                if name < 0 || name as usize >= names_len {
                    return Err(DecodeError::NameOutOfRange {
                        line,
                        index: name,
                        len: names_len,
                    });
                }
                Some(name as usize)
            } else {
                None
            };

            // Lines are 0-based on the wire and 1-based in entries
            let entry_line = to_u32(original_line, line, "original line", segment_offset)?
                .checked_add(1)
                .ok_or(DecodeError::VlqOverflow {
                    offset: segment_offset,
                })?;

            entries.push(MappingEntry {
                generated_line: to_u32(line as i64, line, "generated line", segment_offset)?,
                generated_column: column,
                original_line: entry_line,
                original_column: to_u32(original_column, line, "original column", segment_offset)?,
                source_index: source as usize,
                name_index,
            });
        }
    }

    Ok(entries)
}

/// Encode entries into a `mappings` string.
///
/// Entries are serialized in generated order; entries sharing a generated
/// position keep the order they were supplied in. An entry identical to the
/// one before it is written once.
pub fn encode_mappings(entries: &[MappingEntry]) -> String {
    let mut ordered: Vec<&MappingEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.generated_order_key());

    let mut out = String::new();

    let mut previous_generated_line: u32 = 1;
    let mut previous_generated_column: i64 = 0;
    let mut previous_source: i64 = 0;
    let mut previous_original_line: i64 = 0;
    let mut previous_original_column: i64 = 0;
    let mut previous_name: i64 = 0;

    for (i, entry) in ordered.iter().enumerate() {
        if entry.generated_line != previous_generated_line {
            previous_generated_column = 0;
            while previous_generated_line < entry.generated_line {
                out.push(';');
                previous_generated_line += 1;
            }
        } else if i > 0 {
            if *entry == ordered[i - 1] {
                continue;
            }
            out.push(',');
        }

        let generated_column = i64::from(entry.generated_column);
        encode_vlq(generated_column - previous_generated_column, &mut out);
        previous_generated_column = generated_column;

        let source = entry.source_index as i64;
        encode_vlq(source - previous_source, &mut out);
        previous_source = source;

        // Lines are 1-based in entries and 0-based on the wire
        let original_line = i64::from(entry.original_line) - 1;
        encode_vlq(original_line - previous_original_line, &mut out);
        previous_original_line = original_line;

        let original_column = i64::from(entry.original_column);
        encode_vlq(original_column - previous_original_column, &mut out);
        previous_original_column = original_column;

        if let Some(name_index) = entry.name_index {
            let name = name_index as i64;
            encode_vlq(name - previous_name, &mut out);
            previous_name = name;
        }
    }

    out
}
