//! Citation annotation of TEI documents
//!
//! - `gorn`: tree addresses used as synthetic paragraph ids
//! - `paragraph`: raw text and paragraph ranges of one zone
//! - `mention`: what the citation extractor reports, and the extractor trait
//! - `annotation`: standoff `note` blocks built from resolved mentions
//! - `transform`: the streaming state machine tying it together

pub mod annotation;
pub mod gorn;
pub mod mention;
pub mod paragraph;
pub mod transform;

pub use annotation::{AnnotationBlock, AnnotationBuilder, Certainty};
pub use gorn::TreePosition;
pub use mention::{
    CitationExtractor, ExtractError, Extraction, Mention, MentionKind, PatentCitation, PatentType,
    PublicationStatus,
};
pub use paragraph::{ParagraphIndex, Pointer};
pub use transform::{StreamTransformer, TransformStats};
