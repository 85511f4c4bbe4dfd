//! XML Entity Decoding and Markup Escaping
//!
//! Handles the two directions text travels through the annotator:
//! - Decoding: built-in entities (&lt; &gt; &amp; &quot; &apos;) and numeric
//!   character references (&#123; &#x7B;) in source text and attribute values
//! - Escaping: re-encoding reconstructed paragraph text and generated
//!   attribute values before they are embedded in fresh markup
//!
//! Uses Cow for zero-copy when nothing needs to change.

use memchr::{memchr, memchr3};
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    // Fast path: check if there are any entities using SIMD
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input
///
/// Unknown or unterminated references are kept as-is.
pub fn decode_entities(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let Some(amp_pos) = memchr(b'&', &input[pos..]) else {
            result.extend_from_slice(&input[pos..]);
            break;
        };
        result.extend_from_slice(&input[pos..pos + amp_pos]);
        pos += amp_pos;

        match memchr(b';', &input[pos..]) {
            Some(semi_offset) => {
                let entity = &input[pos + 1..pos + semi_offset];
                match decode_entity(entity) {
                    Some(c) => {
                        let mut utf8 = [0u8; 4];
                        result.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                        pos += semi_offset + 1;
                    }
                    None => {
                        result.push(b'&');
                        pos += 1;
                    }
                }
            }
            None => {
                result.push(b'&');
                pos += 1;
            }
        }
    }

    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &[u8]) -> Option<char> {
    match entity {
        [] => None,
        [b'#', rest @ ..] => decode_numeric_entity(rest),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(entity: &[u8]) -> Option<char> {
    let codepoint = match entity {
        [b'x' | b'X', hex @ ..] => u32::from_str_radix(std::str::from_utf8(hex).ok()?, 16).ok()?,
        dec => std::str::from_utf8(dec).ok()?.parse::<u32>().ok()?,
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

// ============================================================================
// Escaping
// ============================================================================

/// Check whether text contains any character that must be escaped in element content
#[inline]
pub fn needs_escape(input: &str) -> bool {
    let bytes = input.as_bytes();
    memchr3(b'<', b'>', b'&', bytes).is_some() || memchr(b'"', bytes).is_some()
}

/// Escape `< > & "` for embedding text inside element content
pub fn escape_text(input: &str) -> Cow<'_, str> {
    if !needs_escape(input) {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Escape a value for a double-quoted attribute
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape_text(input)
}

/// Collapse every run of two or more whitespace characters into one space
///
/// Single whitespace characters are kept as they are.
pub fn collapse_whitespace(input: &str) -> Cow<'_, str> {
    let mut previous_ws = false;
    let has_run = input.chars().any(|c| {
        let ws = c.is_whitespace();
        let run = ws && previous_ws;
        previous_ws = ws;
        run
    });
    if !has_run {
        return Cow::Borrowed(input);
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() && chars.peek().is_some_and(|n| n.is_whitespace()) {
            while chars.peek().is_some_and(|n| n.is_whitespace()) {
                chars.next();
            }
            result.push(' ');
        } else {
            result.push(c);
        }
    }
    Cow::Owned(result)
}
