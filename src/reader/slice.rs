//! Zero-Copy Slice Reader
//!
//! Reads markup events from a byte slice with zero-copy semantics.
//! Input references are maintained directly in the output.

use super::events::{EndElement, MarkupEvent, StartElement, XmlEvent};
use super::EventSource;
use crate::core::attributes::{find_attribute, parse_attributes};
use crate::core::tokenizer::{Token, TokenKind, Tokenizer};
use crate::error::Result;
use std::borrow::Cow;

/// Zero-copy XML reader from a byte slice
pub struct SliceReader<'a> {
    input: &'a [u8],
    tokenizer: Tokenizer<'a>,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            input,
            tokenizer: Tokenizer::new(input),
        }
    }

    /// Get the next markup event, or None at end of input
    ///
    /// A construct left open at the end of the slice is a fatal error here;
    /// there is nothing more to read.
    pub fn next_event(&mut self) -> Result<Option<MarkupEvent<'a>>> {
        match self.tokenizer.next_token()? {
            Some(token) => Ok(Some(event_from_token(self.input, token, 0))),
            None => Ok(None),
        }
    }
}

impl<'a> EventSource for SliceReader<'a> {
    fn next_markup(&mut self) -> Result<Option<MarkupEvent<'_>>> {
        self.next_event()
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<MarkupEvent<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Build the event for a token of `input`, whose first byte sits at `base` in the stream
pub(crate) fn event_from_token<'a>(input: &'a [u8], token: Token<'a>, base: usize) -> MarkupEvent<'a> {
    let (start, end) = token.span;
    let attributes = || parse_attributes(token.attributes.unwrap_or_default());

    let event = match token.kind {
        TokenKind::StartTag => {
            XmlEvent::StartElement(StartElement::from_cow(token.name.clone().unwrap_or_default(), attributes()))
        }
        TokenKind::EmptyTag => {
            XmlEvent::EmptyElement(StartElement::from_cow(token.name.clone().unwrap_or_default(), attributes()))
        }
        TokenKind::EndTag => XmlEvent::EndElement(EndElement {
            name: token.name.clone().unwrap_or_default(),
        }),
        TokenKind::Text => XmlEvent::Text(token.content.clone().unwrap_or_default()),
        TokenKind::CData => XmlEvent::CData(token.content.clone().unwrap_or_default()),
        TokenKind::Comment => XmlEvent::Comment(token.content.clone().unwrap_or_default()),
        TokenKind::ProcessingInstruction => XmlEvent::ProcessingInstruction {
            target: token.name.clone().unwrap_or_default(),
            data: token.content.clone(),
        },
        TokenKind::XmlDeclaration => {
            let attrs = match token.content {
                Some(Cow::Borrowed(content)) => parse_attributes(content),
                _ => Vec::new(),
            };
            let value = |name: &[u8]| find_attribute(&attrs, name).map(|a| a.value.clone());
            XmlEvent::XmlDeclaration {
                version: value(&b"version"[..]).unwrap_or(Cow::Borrowed(b"1.0")),
                encoding: value(&b"encoding"[..]),
                standalone: value(&b"standalone"[..]).map(|v| v.as_ref() == b"yes"),
            }
        }
        TokenKind::DocType => XmlEvent::DocType(Cow::Borrowed(&input[start..end])),
    };

    MarkupEvent {
        event,
        raw: Cow::Borrowed(&input[start..end]),
        position: base + start,
    }
}

/// Parse XML from a byte slice and return all events
pub fn parse_events(input: &[u8]) -> Result<Vec<MarkupEvent<'_>>> {
    SliceReader::new(input).collect()
}
