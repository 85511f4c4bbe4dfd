//! Byte-level XML primitives
//!
//! - `scanner`: cursor and memchr delimiter search
//! - `tokenizer`: span-carrying tokens, incomplete-input detection
//! - `entities`: entity decoding and markup escaping
//! - `attributes`: attribute lists and qualified names

pub mod attributes;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
