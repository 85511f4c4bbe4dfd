//! Processing strategies
//!
//! - Single document, in memory: `crate::annotate`
//! - Single document, streamed: `crate::annotate_stream`
//! - Many independent documents: `parallel::annotate_parallel`

pub mod parallel;

pub use parallel::annotate_parallel;
