//! Span-carrying XML tokenizer
//!
//! Splits a window of input into tags, text, CDATA sections, comments,
//! processing instructions, the XML declaration and DOCTYPE declarations
//! (the internal subset is skipped, not interpreted).
//!
//! Every token carries the byte span of its source text so callers can
//! re-emit untouched markup verbatim. When the input stops in the middle of
//! a construct the error is flagged as incomplete, which lets a chunked
//! reader fetch more bytes and retry instead of failing.

use super::entities::decode_text;
use super::scanner::{is_whitespace, Scanner};
use std::borrow::Cow;
use thiserror::Error;

/// Where the tokenizer stands between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Between tokens
    InsideText,
    /// Inside `<...>`
    InsideMarkup,
    Done,
}

/// Token kinds; the markup form is shown for each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<a>`
    StartTag,
    /// `</a>`
    EndTag,
    /// `<a/>`
    EmptyTag,
    Text,
    /// `<![CDATA[...]]>`
    CData,
    /// `<!--...-->`
    Comment,
    /// `<?target ...?>`
    ProcessingInstruction,
    /// `<?xml ...?>`
    XmlDeclaration,
    /// `<!DOCTYPE ...>`
    DocType,
}

/// One token and the bytes it spans
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Half-open byte range `[start, end)` in the window
    pub span: (usize, usize),
    /// For tags and PIs: the element name or target
    pub name: Option<Cow<'a, [u8]>>,
    /// For text/cdata/comments: the content (owned if entities decoded)
    pub content: Option<Cow<'a, [u8]>>,
    /// For start and empty tags: the bytes between the name and '>' or '/>'
    pub attributes: Option<&'a [u8]>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize)) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            attributes: None,
        }
    }

    fn with_name(mut self, name: &'a [u8]) -> Self {
        self.name = Some(Cow::Borrowed(name));
        self
    }

    fn with_content(mut self, content: Cow<'a, [u8]>) -> Self {
        self.content = Some(content);
        self
    }

    fn with_attributes(mut self, attributes: &'a [u8]) -> Self {
        self.attributes = Some(attributes);
        self
    }
}

/// Tokenizer failure with the byte position it was detected at
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    incomplete: bool,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
            incomplete: false,
        }
    }

    /// The input ended inside a construct; more bytes may complete it
    pub fn incomplete(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
            incomplete: true,
        }
    }

    /// True when the error would go away with more input
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Shift the position by the offset of the window the tokenizer ran on
    pub fn offset_by(mut self, base: usize) -> Self {
        self.position += base;
        self
    }
}

/// Pull tokenizer over one window of input
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: ParseState,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            state: ParseState::InsideText,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Offset of the next unread byte
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next token, or None at end of input
    ///
    /// Leading whitespace is reported as text so spans tile the input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        if self.state == ParseState::Done {
            return Ok(None);
        }

        match self.scanner.peek() {
            Some(b'<') => self.parse_markup().map(Some),
            Some(_) => Ok(Some(self.parse_text())),
            None => {
                self.state = ParseState::Done;
                Ok(None)
            }
        }
    }

    fn incomplete(&self, what: &str, start: usize) -> ParseError {
        ParseError::incomplete(format!("Unterminated {}", what), start)
    }

    /// Parse markup starting with '<'
    fn parse_markup(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1); // Skip '<'
        self.state = ParseState::InsideMarkup;

        let token = match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => Err(self.incomplete("markup", start)),
        };

        if token.is_err() {
            self.scanner.set_position(start);
        }
        self.state = ParseState::InsideText;
        token
    }

    /// Parse a start tag or empty element tag
    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid element name", start))?;
        let name_end = self.scanner.position();

        // A name must be followed by whitespace, '/' or '>'
        match self.scanner.peek() {
            None => return Err(self.incomplete("start tag", start)),
            Some(b) if is_whitespace(b) || b == b'/' || b == b'>' => {}
            Some(_) => return Err(ParseError::new("Invalid character in element name", name_end)),
        }

        // Find the end of the tag, handling quoted attributes
        let end = self
            .scanner
            .find_unquoted(b'>')
            .ok_or_else(|| self.incomplete("start tag", start))?;

        let is_empty = end > name_end && self.scanner.slice(end - 1, end) == b"/";
        let attr_end = if is_empty { end - 1 } else { end };
        let attributes = self.scanner.slice(name_end, attr_end);

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        Ok(Token::new(kind, (start, end + 1))
            .with_name(name)
            .with_attributes(attributes))
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '/'

        if self.scanner.is_eof() {
            return Err(self.incomplete("end tag", start));
        }
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid element name in end tag", start))?;

        self.scanner.skip_whitespace();
        match self.scanner.peek() {
            Some(b'>') => {}
            Some(_) => return Err(ParseError::new("End tag cannot have attributes", start)),
            None => return Err(self.incomplete("end tag", start)),
        }

        self.scanner.advance(1);
        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position())).with_name(name))
    }

    /// Parse markup starting with '!' (comment, CDATA, DOCTYPE)
    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            // Too few bytes to tell which declaration this is
            let remaining = self.scanner.remaining();
            let is_prefix = [b"--" as &[u8], b"[CDATA[", b"DOCTYPE"]
                .iter()
                .any(|keyword| keyword.starts_with(remaining));
            if is_prefix {
                Err(self.incomplete("declaration", start))
            } else {
                Err(ParseError::new("Invalid declaration - expected comment, CDATA, or DOCTYPE", start))
            }
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();

        let end = self
            .scanner
            .find(b"-->")
            .ok_or_else(|| self.incomplete("comment", start))?;
        let content = self.scanner.slice(content_start, end);

        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::Comment, (start, end + 3)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip '[CDATA['
        let content_start = self.scanner.position();

        let end = self
            .scanner
            .find(b"]]>")
            .ok_or_else(|| self.incomplete("CDATA section", start))?;
        let content = self.scanner.slice(content_start, end);

        self.scanner.set_position(end + 3);
        Ok(Token::new(TokenKind::CData, (start, end + 3)).with_content(Cow::Borrowed(content)))
    }

    /// Parse a DOCTYPE declaration
    ///
    /// Format: <!DOCTYPE name [internal subset]> or <!DOCTYPE name SYSTEM "uri">
    /// The internal subset is skipped bracket- and quote-aware, never interpreted.
    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7); // Skip 'DOCTYPE'

        let mut depth = 0usize;
        let mut quote: Option<u8> = None;

        while let Some(b) = self.scanner.peek() {
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => {
                    self.scanner.advance(1);
                    return Ok(Token::new(TokenKind::DocType, (start, self.scanner.position())));
                }
                _ => {}
            }
            self.scanner.advance(1);
        }

        Err(self.incomplete("DOCTYPE", start))
    }

    /// Parse a processing instruction <?...?>
    fn parse_pi(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1); // Skip '?'

        if self.scanner.is_eof() {
            return Err(self.incomplete("processing instruction", start));
        }
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Invalid processing instruction target", start))?;

        let content_start = self.scanner.position();
        let end = self
            .scanner
            .find(b"?>")
            .ok_or_else(|| self.incomplete("processing instruction", start))?;
        let content = self.scanner.slice(content_start, end);

        self.scanner.set_position(end + 2);

        let kind = if name == b"xml" {
            TokenKind::XmlDeclaration
        } else {
            TokenKind::ProcessingInstruction
        };
        Ok(Token::new(kind, (start, end + 2))
            .with_name(name)
            .with_content(Cow::Borrowed(content)))
    }

    /// Parse text content up to the next '<' or end of input
    fn parse_text(&mut self) -> Token<'a> {
        let start = self.scanner.position();
        let end = self.scanner.find_byte(b'<').unwrap_or(self.scanner.end());

        let content = self.scanner.slice(start, end);
        self.scanner.set_position(end);

        Token::new(TokenKind::Text, (start, end)).with_content(decode_text(content))
    }
}

/// Iterator adapter for tokenizer
impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &[u8]) -> Vec<TokenKind> {
        Tokenizer::new(input).map(|t| t.unwrap().kind).collect()
    }

    #[test]
    fn test_simple_element() {
        let mut tok = Tokenizer::new(b"<root>content</root>");

        let t1 = tok.next_token().unwrap().unwrap();
        assert_eq!(t1.kind, TokenKind::StartTag);
        assert_eq!(t1.name.as_ref().map(|c| c.as_ref()), Some(b"root" as &[u8]));
        assert_eq!(t1.span, (0, 6));

        let t2 = tok.next_token().unwrap().unwrap();
        assert_eq!(t2.kind, TokenKind::Text);
        assert_eq!(t2.content.as_ref().map(|c| c.as_ref()), Some(b"content" as &[u8]));

        let t3 = tok.next_token().unwrap().unwrap();
        assert_eq!(t3.kind, TokenKind::EndTag);
        assert_eq!(t3.name.as_ref().map(|c| c.as_ref()), Some(b"root" as &[u8]));
        assert_eq!(t3.span, (13, 20));

        assert!(tok.next_token().unwrap().is_none());
        assert_eq!(tok.state(), ParseState::Done);
    }

    #[test]
    fn test_start_tag_attributes_slice() {
        let mut tok = Tokenizer::new(b"<div type=\"a>b\"><p/>");
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.kind, TokenKind::StartTag);
        assert_eq!(t.attributes, Some(b" type=\"a>b\"" as &[u8]));

        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.kind, TokenKind::EmptyTag);
        assert_eq!(t.attributes, Some(b"" as &[u8]));
    }

    #[test]
    fn test_spans_tile_input() {
        let input = b"  <?xml version=\"1.0\"?>\n<!DOCTYPE TEI [<!ENTITY x \"]>\">]><TEI><!-- c --><![CDATA[<x>]]><?pi data?></TEI>\n";
        let mut expected_start = 0;
        for token in Tokenizer::new(input) {
            let token = token.unwrap();
            assert_eq!(token.span.0, expected_start);
            expected_start = token.span.1;
        }
        assert_eq!(expected_start, input.len());
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Text,
                TokenKind::XmlDeclaration,
                TokenKind::Text,
                TokenKind::DocType,
                TokenKind::StartTag,
                TokenKind::Comment,
                TokenKind::CData,
                TokenKind::ProcessingInstruction,
                TokenKind::EndTag,
                TokenKind::Text,
            ]
        );
    }

    #[test]
    fn test_text_is_decoded() {
        let mut tok = Tokenizer::new(b"a &amp; b");
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.content.as_ref().map(|c| c.as_ref()), Some(b"a & b" as &[u8]));
        assert_eq!(t.span, (0, 9));
    }

    #[test]
    fn test_cdata_and_comment_content() {
        let mut tok = Tokenizer::new(b"<![CDATA[<script>]]><!-- a -- b -->");
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.content.as_ref().map(|c| c.as_ref()), Some(b"<script>" as &[u8]));
        let t = tok.next_token().unwrap().unwrap();
        assert_eq!(t.content.as_ref().map(|c| c.as_ref()), Some(b" a -- b " as &[u8]));
    }

    #[test]
    fn test_truncated_input_is_incomplete() {
        for input in [
            b"<" as &[u8],
            b"<di",
            b"<div type=\"x>",
            b"</di",
            b"</div ",
            b"<!",
            b"<!-",
            b"<![CDA",
            b"<!-- open",
            b"<![CDATA[ open ]]",
            b"<!DOCTYPE x [ ]",
            b"<?pi open ?",
        ] {
            let err = Tokenizer::new(input).next_token().unwrap_err();
            assert!(err.is_incomplete(), "expected incomplete for {:?}", input);
            assert_eq!(err.position, 0);
        }
    }

    #[test]
    fn test_malformed_input_is_fatal() {
        for input in [b"<1abc>" as &[u8], b"</p x>", b"<!FOO>", b"<a\"b>", b"<?1?>"] {
            let err = Tokenizer::new(input).next_token().unwrap_err();
            assert!(!err.is_incomplete(), "expected fatal for {:?}", input);
        }
    }

    #[test]
    fn test_error_offset() {
        let err = ParseError::new("bad", 3).offset_by(10);
        assert_eq!(err.position, 13);
        assert_eq!(err.to_string(), "bad at byte 13");
    }
}
