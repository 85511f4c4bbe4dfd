//! XML Attribute Parsing
//!
//! Parses XML attributes from tag content. Parsing is lenient: malformed
//! attributes are skipped rather than rejected, since attributes of untouched
//! elements are never re-serialized (their source bytes are).

use super::entities::decode_text;
use super::scanner::{is_whitespace, Scanner};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        Attribute {
            name: Cow::Borrowed(name),
            value,
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    /// Value as UTF-8, if it is
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &[u8] {
        local_name(self.name.as_ref())
    }

    /// Detach from the input buffer
    pub fn into_owned(self) -> Attribute<'static> {
        Attribute {
            name: Cow::Owned(self.name.into_owned()),
            value: Cow::Owned(self.value.into_owned()),
        }
    }
}

/// Strip the namespace prefix from a qualified name
#[inline]
pub fn local_name(name: &[u8]) -> &[u8] {
    match memchr(b':', name) {
        Some(colon_pos) => &name[colon_pos + 1..],
        None => name,
    }
}

/// Parse the attribute list of a tag, i.e. the bytes between the element
/// name and `>` or `/>`
///
/// Valueless attributes get an empty value; unquoted values run to the next
/// whitespace. Bytes that cannot start a name are skipped.
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    let mut attrs = Vec::new();
    let mut scanner = Scanner::new(input);

    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            None | Some(b'/') | Some(b'>') => break,
            Some(_) => {}
        }
        let Some(name) = scanner.read_name() else {
            scanner.advance(1);
            continue;
        };

        scanner.skip_whitespace();
        if scanner.peek() != Some(b'=') {
            attrs.push(Attribute::new(name, Cow::Borrowed(b"")));
            continue;
        }
        scanner.advance(1);
        scanner.skip_whitespace();

        let value = match scanner.peek() {
            None => break,
            Some(quote @ (b'"' | b'\'')) => {
                let start = scanner.position() + 1;
                scanner.set_position(start);
                let end = scanner.find_byte(quote).unwrap_or(scanner.end());
                scanner.set_position(end + 1);
                scanner.slice(start, end)
            }
            Some(_) => {
                let start = scanner.position();
                let len = scanner
                    .remaining()
                    .iter()
                    .take_while(|&&b| !is_whitespace(b) && b != b'/' && b != b'>')
                    .count();
                scanner.advance(len);
                scanner.slice(start, start + len)
            }
        };
        attrs.push(Attribute::new(name, decode_text(value)));
    }

    attrs
}

/// Find an attribute by its qualified name
pub fn find_attribute<'b, 'a>(attrs: &'b [Attribute<'a>], name: &[u8]) -> Option<&'b Attribute<'a>> {
    attrs.iter().find(|attr| attr.name.as_ref() == name)
}
