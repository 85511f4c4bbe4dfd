//! Byte cursor over markup, with memchr-backed delimiter search
//!
//! memchr picks SSE2/AVX2 on x86_64 and NEON on aarch64 at runtime.
//!
//! Searches never fail on their own: `None` means the delimiter is not in
//! the bytes the cursor can see, and the tokenizer decides whether that is
//! malformed markup or just a window that ends too early.

use memchr::{memchr, memchr3, memmem};

/// Cursor over one window of input
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor, clamped to the end of the window
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.set_position(self.pos + n);
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Window length, i.e. the offset one past the last visible byte
    #[inline]
    pub fn end(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    pub fn skip_whitespace(&mut self) {
        let skipped = self.remaining().iter().take_while(|&&b| is_whitespace(b)).count();
        self.pos += skipped;
    }

    /// Absolute offset of the next `byte`
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.remaining()).map(|i| self.pos + i)
    }

    /// Absolute offset of the next `needle`
    #[inline]
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.remaining(), needle).map(|i| self.pos + i)
    }

    /// Absolute offset of the next `delimiter` outside quoted attribute values
    ///
    /// Jumps from quote to quote, so long attribute values cost one search
    /// each instead of a byte-by-byte walk.
    pub fn find_unquoted(&self, delimiter: u8) -> Option<usize> {
        let mut pos = self.pos;
        loop {
            let hit = pos + memchr3(delimiter, b'"', b'\'', &self.input[pos..])?;
            let byte = self.input[hit];
            if byte == delimiter {
                return Some(hit);
            }
            // Skip to the matching quote
            pos = hit + 1 + memchr(byte, &self.input[hit + 1..])? + 1;
        }
    }

    /// Read an XML name at the cursor; the cursor stays put if there is none
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        if !is_name_start_char(*self.input.get(start)?) {
            return None;
        }
        let len = 1 + self.input[start + 1..].iter().take_while(|&&b| is_name_char(b)).count();
        self.pos = start + len;
        Some(&self.input[start..self.pos])
    }
}

/// ASCII letters, `_`, `:` and any byte of a multi-byte UTF-8 sequence
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
