//! Fatal errors of an annotation run
//!
//! Only stream-level failures live here: malformed input, broken nesting,
//! sink write failures. Mentions that fail to resolve and extractor failures
//! are recovered inside the zone that produced them and never become an
//! `Error`.

use crate::core::tokenizer::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed markup: {0}")]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 in {context} at byte {position}")]
    InvalidUtf8 { context: &'static str, position: usize },

    #[error("end tag </{found}> at byte {position} does not close <{expected}>")]
    MismatchedTag {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("end tag </{name}> at byte {position} has no open element")]
    UnbalancedEndTag { name: String, position: usize },

    #[error("paragraph opened at byte {position} is not closed before its zone ends")]
    UnterminatedParagraph { position: usize },

    #[error("input ended with {open} element(s) still open")]
    UnexpectedEof { open: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_converts() {
        let err: Error = ParseError::new("Invalid element name", 12).into();
        assert_eq!(err.to_string(), "malformed markup: Invalid element name at byte 12");
    }

    #[test]
    fn test_structural_messages() {
        let err = Error::MismatchedTag {
            expected: "p".into(),
            found: "div".into(),
            position: 40,
        };
        assert_eq!(err.to_string(), "end tag </div> at byte 40 does not close <p>");
        assert_eq!(
            Error::UnexpectedEof { open: 2 }.to_string(),
            "input ended with 2 element(s) still open"
        );
    }
}
