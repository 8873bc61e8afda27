//! String List Codec
//!
//! Encodes a list of strings into a single self-describing text blob and
//! decodes such a blob back into the original list. The encoded form is a
//! 4-digit zero-padded element count followed by, per element, a 5-digit
//! zero-padded character length and exactly that many characters of payload,
//! with no separators. Lengths are measured in characters, not bytes.
//!
//! Carriage returns are canonicalized before encoding: every `\r\n` pair and
//! every lone `\r` becomes a single `\n`. Decoding does not reverse this, so
//! round trips are exact only modulo line-ending normalization.

use crate::error::CodecError;

/// The maximum number of strings that can be encoded.
pub const MAX_NUM_STRINGS: usize = 9999;
/// The maximum length, in characters, of any individual string to be encoded.
pub const MAX_STRING_LENGTH: usize = 99999;

/// The number of characters used to represent the total number of encoded strings.
const NUM_STRINGS_FIELD_LENGTH: usize = 4;
/// The number of characters used to represent an element length field.
const STRING_LENGTH_FIELD_LENGTH: usize = 5;

/// Replaces every `\r\n` pair, then every remaining `\r`, with `\n`.
fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Encodes the given list of strings into a single string.
///
/// Fails with [`CodecError::TooManyElements`] if the list holds more than
/// [`MAX_NUM_STRINGS`] elements, or [`CodecError::ElementTooLong`] if any
/// element exceeds [`MAX_STRING_LENGTH`] characters after line-break
/// normalization. No partial output is produced on error.
pub fn encode<S: AsRef<str>>(elements: &[S]) -> Result<String, CodecError> {
    if elements.len() > MAX_NUM_STRINGS {
        return Err(CodecError::TooManyElements {
            count: elements.len(),
        });
    }

    // Exact capacity is cheap to compute and avoids repeated reallocation for
    // the large encoded strings this codec typically produces.
    let capacity = NUM_STRINGS_FIELD_LENGTH
        + elements
            .iter()
            .map(|e| e.as_ref().len() + STRING_LENGTH_FIELD_LENGTH)
            .sum::<usize>();
    let mut buffer = String::with_capacity(capacity);

    buffer.push_str(&format!("{:04}", elements.len()));
    for (index, element) in elements.iter().enumerate() {
        let normalized = normalize_line_breaks(element.as_ref());
        let length = normalized.chars().count();
        if length > MAX_STRING_LENGTH {
            return Err(CodecError::ElementTooLong { index, length });
        }
        buffer.push_str(&format!("{:05}", length));
        buffer.push_str(&normalized);
    }
    Ok(buffer)
}

/// Decodes an encoded string back into a list of strings.
///
/// The input must be consumed exactly: a declared count/length combination
/// that falls short of or overshoots the string's actual length fails with
/// [`CodecError::TruncatedOrOverlongEncoding`]; a non-numeric count or length
/// field fails with [`CodecError::MalformedField`]. A partial list is never
/// returned.
pub fn decode(encoded: &str) -> Result<Vec<String>, CodecError> {
    let normalized = normalize_line_breaks(encoded);
    let chars: Vec<char> = normalized.chars().collect();

    let num_fields = read_field(&chars, 0, NUM_STRINGS_FIELD_LENGTH, "count")?;

    let mut elements = Vec::with_capacity(num_fields);
    // Cursor always holds the index of the next character to be processed.
    let mut cursor = NUM_STRINGS_FIELD_LENGTH;
    for _ in 0..num_fields {
        let field_length = read_field(&chars, cursor, STRING_LENGTH_FIELD_LENGTH, "length")?;
        cursor += STRING_LENGTH_FIELD_LENGTH;

        if cursor + field_length > chars.len() {
            return Err(CodecError::TruncatedOrOverlongEncoding {
                cursor,
                length: chars.len(),
            });
        }
        elements.push(chars[cursor..cursor + field_length].iter().collect());
        cursor += field_length;
    }

    // The declared fields must account for the entire string.
    if cursor != chars.len() {
        return Err(CodecError::TruncatedOrOverlongEncoding {
            cursor,
            length: chars.len(),
        });
    }
    Ok(elements)
}

/// Reads a fixed-width decimal field starting at `offset`.
fn read_field(
    chars: &[char],
    offset: usize,
    width: usize,
    field: &'static str,
) -> Result<usize, CodecError> {
    if offset + width > chars.len() {
        return Err(CodecError::TruncatedOrOverlongEncoding {
            cursor: offset,
            length: chars.len(),
        });
    }
    let digits = &chars[offset..offset + width];
    if !digits.iter().all(|c| c.is_ascii_digit()) {
        return Err(CodecError::MalformedField { field, offset });
    }
    digits
        .iter()
        .collect::<String>()
        .parse()
        .map_err(|_| CodecError::MalformedField { field, offset })
}
