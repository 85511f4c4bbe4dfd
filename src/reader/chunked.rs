//! Chunked XML Reader
//!
//! Reads markup events from any source implementing Read, holding only the
//! unconsumed part of the stream plus the chunk being read.
//!
//! Tokens are cut from the buffered window. A token that touches the end of
//! the window may still grow (text runs until the next '<'), and a construct
//! cut short by the window reports itself as incomplete; both cases pull the
//! next chunk and retry. Only at end of input is an incomplete construct a
//! real error.

use super::events::MarkupEvent;
use super::slice::event_from_token;
use super::EventSource;
use crate::core::tokenizer::Tokenizer;
use crate::error::Result;
use std::io::{ErrorKind, Read};

/// Buffer size for reading chunks
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Bounded-memory XML reader for streaming input
pub struct ChunkedReader<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    /// Consumed bytes at the front of `buffer`
    pos: usize,
    /// Stream offset of `buffer[0]`
    base: usize,
    chunk_size: usize,
    eof: bool,
}

enum Step {
    Emit(MarkupEvent<'static>, usize),
    Refill,
}

impl<R: Read> ChunkedReader<R> {
    /// Create a new chunked reader
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Create a new chunked reader with specified chunk size
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        ChunkedReader {
            reader,
            buffer: Vec::with_capacity(chunk_size.max(1)),
            pos: 0,
            base: 0,
            chunk_size: chunk_size.max(1),
            eof: false,
        }
    }

    /// Stream offset of the next unconsumed byte
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// Unconsumed buffered bytes
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    /// Compact the buffer and read one more chunk; false once the source is exhausted
    ///
    /// A read is at least as large as what is already buffered, so a token
    /// spanning many chunks doubles the window each time and is rescanned a
    /// logarithmic number of times.
    fn fill_buffer(&mut self) -> std::io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        // Compact: drop consumed data
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.base += self.pos;
            self.pos = 0;
        }

        let filled = self.buffer.len();
        self.buffer.resize(filled + self.chunk_size.max(filled), 0);
        let read = loop {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(filled);
                    return Err(e);
                }
            }
        };
        self.buffer.truncate(filled + read);

        if read == 0 {
            self.eof = true;
        }
        Ok(read > 0)
    }

    /// Get the next markup event, or None at end of input
    pub fn next_event(&mut self) -> Result<Option<MarkupEvent<'static>>> {
        loop {
            let step = {
                let window = &self.buffer[self.pos..];
                match Tokenizer::new(window).next_token() {
                    Ok(Some(token)) if token.span.1 < window.len() || self.eof => {
                        let end = token.span.1;
                        let event = event_from_token(window, token, self.base + self.pos);
                        Step::Emit(event.into_owned(), end)
                    }
                    Ok(None) if self.eof => return Ok(None),
                    Ok(_) => Step::Refill,
                    Err(e) if e.is_incomplete() && !self.eof => Step::Refill,
                    Err(e) => return Err(e.offset_by(self.base + self.pos).into()),
                }
            };

            match step {
                Step::Emit(event, end) => {
                    self.pos += end;
                    return Ok(Some(event));
                }
                Step::Refill => {
                    self.fill_buffer()?;
                }
            }
        }
    }
}

impl<R: Read> EventSource for ChunkedReader<R> {
    fn next_markup(&mut self) -> Result<Option<MarkupEvent<'_>>> {
        self.next_event()
    }
}

impl<R: Read> Iterator for ChunkedReader<R> {
    type Item = Result<MarkupEvent<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::reader::slice::parse_events;
    use std::io::Cursor;

    const DOC: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE TEI [<!ENTITY e \"x\">]>\n<TEI xmlns=\"http://www.tei-c.org/ns/1.0\"><teiHeader/><!-- note --><text><div type=\"description\"><p xml:id=\"p1\">Caf\xc3\xa9 &amp; cr\xc3\xa8me <hi rend=\"b\">bold</hi> tail</p><![CDATA[raw <x>]]><?pi data?></div></text></TEI>\n";

    #[test]
    fn test_matches_slice_reader_for_every_chunk_size() {
        let expected = parse_events(DOC).unwrap();
        for chunk_size in [1, 2, 3, 7, 16, 64, 8192] {
            let events: Vec<_> = ChunkedReader::with_chunk_size(Cursor::new(DOC), chunk_size)
                .collect::<Result<_>>()
                .unwrap();
            assert_eq!(events.len(), expected.len(), "chunk size {}", chunk_size);
            for (got, want) in events.iter().zip(&expected) {
                assert_eq!(got, want, "chunk size {}", chunk_size);
            }
        }
    }

    #[test]
    fn test_consumed_data_is_released() {
        let mut reader = ChunkedReader::with_chunk_size(Cursor::new(DOC), 4);
        while reader.next_event().unwrap().is_some() {
            assert!(reader.buffered().len() <= DOC.len());
        }
        assert_eq!(reader.position(), DOC.len());
        assert!(reader.buffer.capacity() < DOC.len());
    }

    /// Counts calls to `read`
    struct CountingReader<'a> {
        inner: Cursor<&'a [u8]>,
        reads: usize,
    }

    impl Read for CountingReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_long_token_grows_the_window() {
        let mut doc = b"<a><!--".to_vec();
        doc.extend(std::iter::repeat(b'x').take(10_000));
        doc.extend_from_slice(b"--></a>");

        let mut source = CountingReader { inner: Cursor::new(doc.as_slice()), reads: 0 };
        let events: Vec<_> = ChunkedReader::with_chunk_size(&mut source, 1)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(events, parse_events(&doc).unwrap());
        assert!(source.reads < 64, "{} reads", source.reads);
    }

    #[test]
    fn test_truncated_stream_is_error_at_eof() {
        let mut reader = ChunkedReader::with_chunk_size(Cursor::new(b"<a><b attr=\"x".to_vec()), 2);
        assert!(reader.next_event().unwrap().is_some());
        match reader.next_event() {
            Err(Error::Parse(e)) => {
                assert!(e.is_incomplete());
                assert_eq!(e.position, 3);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_markup_fails_without_reading_on() {
        let mut reader = ChunkedReader::with_chunk_size(Cursor::new(b"<a></a x>".to_vec()), 64);
        assert!(reader.next_event().unwrap().is_some());
        assert!(matches!(reader.next_event(), Err(Error::Parse(e)) if !e.is_incomplete() && e.position == 3));
    }

    #[test]
    fn test_empty_input() {
        let mut reader = ChunkedReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_event().unwrap().is_none());
    }
}
