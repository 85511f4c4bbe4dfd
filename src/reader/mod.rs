//! XML Reader Module
//!
//! Provides different reading strategies:
//! - SliceReader: Zero-copy reader over an in-memory document
//! - ChunkedReader: Bounded-memory reader over any `std::io::Read`
//! - Events: XML event types for pull parsing

pub mod chunked;
pub mod events;
pub mod slice;

use crate::error::Result;
use events::MarkupEvent;

/// A pull source of markup events
pub trait EventSource {
    /// Next event, or None once the input is exhausted
    fn next_markup(&mut self) -> Result<Option<MarkupEvent<'_>>>;
}
