//! RustyTEI - Streaming citation annotation for TEI documents
//!
//! Reads a stream of TEI documents, rebuilds every citation zone
//! (`<div type="description">`) from its paragraphs, asks an external
//! citation extractor for the mentions in each zone, and injects standoff
//! annotations pointing back into the paragraphs with
//! `#string-range('id',offset,length)`. Everything else passes through
//! byte for byte.
//!
//! Entry points:
//! - `annotate`: whole document in memory (zero-copy slice reader)
//! - `annotate_stream`: any `Read` to any `Write` in bounded memory
//! - `annotate_parallel`: many independent documents with Rayon
//! - `StreamTransformer`: push one `MarkupEvent` at a time

pub mod annotate;
pub mod config;
pub mod core;
pub mod error;
pub mod reader;
pub mod strategy;
pub mod writer;

pub use annotate::{CitationExtractor, ExtractError, Extraction, Mention, StreamTransformer};
pub use config::{Layout, TeiMarkers, TransformConfig};
pub use error::{Error, Result};
pub use reader::chunked::ChunkedReader;
pub use reader::slice::SliceReader;
pub use strategy::annotate_parallel;

use std::io::{Read, Write};

// ============================================================================
// Entry points
// ============================================================================

/// Annotate one in-memory input
///
/// The extractor is closed when the run ends, successfully or not.
pub fn annotate<E: CitationExtractor>(input: &[u8], config: &TransformConfig, mut extractor: E) -> Result<Vec<u8>> {
    let transformer = StreamTransformer::new(Vec::with_capacity(input.len() + 1024), &mut extractor, config.clone());
    let result = transformer.run(SliceReader::new(input));
    extractor.close();
    result
}

/// Annotate from `reader` into `writer`, reading `config.chunk_size` bytes at a time
///
/// Output is written as soon as it can no longer change; only the part of a
/// document after its anchor is held until the document closes.
pub fn annotate_stream<R, W, E>(reader: R, writer: W, config: &TransformConfig, mut extractor: E) -> Result<W>
where
    R: Read,
    W: Write,
    E: CitationExtractor,
{
    let source = ChunkedReader::with_chunk_size(reader, config.chunk_size);
    let transformer = StreamTransformer::new(writer, &mut extractor, config.clone());
    let result = transformer.run(source);
    extractor.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::mention::PatentCitation;
    use chrono::NaiveDate;

    /// Finds "US-<digits>" and reports each as a patent
    #[derive(Default)]
    struct UsPatents {
        closed: bool,
        zones: usize,
    }

    impl CitationExtractor for UsPatents {
        fn extract(&mut self, raw_text: &str, _: bool, _: bool) -> std::result::Result<Extraction, ExtractError> {
            self.zones += 1;
            let chars: Vec<char> = raw_text.chars().collect();
            let mut patents = Vec::new();
            let mut i = 0;
            while i + 3 < chars.len() {
                if chars[i..i + 3] == ['U', 'S', '-'] {
                    let end = (i + 3..chars.len())
                        .find(|&j| !chars[j].is_ascii_digit())
                        .unwrap_or(chars.len());
                    let number: String = chars[i + 3..end].iter().collect();
                    patents.push(Mention::from_patent(&PatentCitation::new("US", number), i, end));
                    i = end;
                } else {
                    i += 1;
                }
            }
            Ok(Extraction::new(patents, vec![]))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn config() -> TransformConfig {
        TransformConfig::default().with_annotation_date(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap())
    }

    fn corpus() -> String {
        let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<teiCorpus>\n");
        for n in 0..40 {
            doc.push_str(&format!(
                "<TEI>\n<teiHeader><fileDesc><notesStmt><note>doc {n}</note></notesStmt></fileDesc></teiHeader>\n<text><body>\n<div type=\"description\">\n<p>Compare US-{n}00 with <hi rend=\"italic\">prior art</hi>.</p>\n<p>Café and US-7{n} &amp; more.</p>\n</div>\n<div type=\"claims\"><p>unchanged US-1</p></div>\n</body></text>\n</TEI>\n"
            ));
        }
        doc.push_str("</teiCorpus>\n");
        doc
    }

    #[test]
    fn test_annotate_closes_extractor() {
        let mut extractor = UsPatents::default();
        let input = "<TEI><teiHeader><notesStmt></notesStmt></teiHeader><text><div type=\"description\"><p>See US-8303618.</p></div></text></TEI>";
        let output = annotate(input.as_bytes(), &config(), &mut extractor).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(extractor.closed);
        assert_eq!(extractor.zones, 1);
        assert!(output.contains("<idno type=\"docNumber\">8303618</idno>"));
        assert!(output.contains("<ptr target=\"#string-range('1.2.1.1',4,10)\"/>"));
        assert!(output.contains("<p xml:id=\"1.2.1.1\">See US-8303618.</p>"));
    }

    #[test]
    fn test_annotate_closes_extractor_on_error() {
        let mut extractor = UsPatents::default();
        assert!(annotate(b"<TEI><p></TEI>", &config(), &mut extractor).is_err());
        assert!(extractor.closed);
    }

    #[test]
    fn test_stream_matches_in_memory() {
        let input = corpus();
        let expected = annotate(input.as_bytes(), &config(), UsPatents::default()).unwrap();

        for chunk_size in [1, 7, 64, 4096] {
            let config = config().with_chunk_size(chunk_size).with_flush_threshold(256);
            let output = annotate_stream(input.as_bytes(), Vec::new(), &config, UsPatents::default()).unwrap();
            assert_eq!(output, expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_corpus_annotations_stay_in_their_document() {
        let input = corpus();
        let output = String::from_utf8(annotate(input.as_bytes(), &config(), UsPatents::default()).unwrap()).unwrap();

        let documents: Vec<&str> = output.split("</TEI>").collect();
        assert_eq!(documents.len(), 41);
        for (n, doc) in documents[..40].iter().enumerate() {
            assert_eq!(doc.matches("<item>").count(), 2, "document {}", n);
            assert!(doc.contains(&format!("<idno type=\"docNumber\">{}00</idno>", n)));
            assert!(doc.contains(&format!("<idno type=\"docNumber\">7{}</idno>", n)));
            assert!(doc.contains("<div type=\"claims\"><p>unchanged US-1</p></div>"));
            let note = doc.find("<note type=\"standoff-annotation\"").unwrap();
            assert!(note < doc.find("</notesStmt>").unwrap());
        }
    }

    #[test]
    fn test_text_outside_zones_is_untouched() {
        let input = corpus();
        let output = String::from_utf8(annotate(input.as_bytes(), &config(), UsPatents::default()).unwrap()).unwrap();
        assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<teiCorpus>\n<TEI>\n<teiHeader>"));
        assert!(output.ends_with("</text>\n</TEI>\n</teiCorpus>\n"));
    }
}
