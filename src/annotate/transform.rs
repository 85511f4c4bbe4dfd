//! Streaming TEI transformer
//!
//! Consumes markup events one at a time and writes the document back out
//! unchanged, except for:
//! - citation zones (`<div type="description">`), which are rebuilt from
//!   their paragraphs
//! - one standoff annotation block per document, placed right before the
//!   closing tag of the document's `notesStmt`
//!
//! Zones are handled as they stream by: their text is collected into a
//! `ParagraphIndex`, handed to the extractor when the zone closes, and the
//! rebuilt zone is emitted in its place. Annotations wait until the document
//! closes, since the anchor sits in the header, before any zone.
//!
//! Output before the anchor is written to the sink as soon as the anchor
//! closes; output after it is held until the document closes so the
//! annotation block can go in front of it.

use super::annotation::AnnotationBuilder;
use super::gorn::TreePosition;
use super::mention::{CitationExtractor, Extraction};
use super::paragraph::{OpeningTag, ParagraphIndex};
use crate::config::{Layout, TransformConfig};
use crate::core::attributes::local_name;
use crate::error::{Error, Result};
use crate::reader::events::{MarkupEvent, StartElement, XmlEvent};
use crate::reader::EventSource;
use log::{debug, warn};
use std::io::Write;

/// Counters of a transformer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub documents: usize,
    pub zones: usize,
    pub paragraphs: usize,
    pub annotations: usize,
    pub dropped_mentions: usize,
    pub failed_extractions: usize,
}

/// A citation zone being read
struct Zone {
    index: ParagraphIndex,
    /// Nesting depth of the zone element
    depth: usize,
}

/// A paragraph being read
struct Paragraph {
    depth: usize,
    position: usize,
    /// Source markup of open inline elements, not yet in the raw text
    inline: String,
}

#[derive(Default)]
enum ZoneState {
    #[default]
    Passthrough,
    InZone(Zone),
    InParagraph(Zone, Paragraph),
}

/// Push-based transformer over a stream of TEI documents
pub struct StreamTransformer<W: Write, E: CitationExtractor> {
    config: TransformConfig,
    sink: W,
    extractor: E,
    tree: TreePosition,
    /// Qualified names of open elements, outermost first
    open: Vec<String>,
    state: ZoneState,
    /// Output not yet written to the sink
    pending: Vec<u8>,
    /// Closing tag of the anchor container, held back until the document closes
    anchor: Option<Vec<u8>>,
    /// Annotation blocks of the current document
    annotations: String,
    /// Document elements currently open
    documents_open: usize,
    stats: TransformStats,
}

impl<W: Write, E: CitationExtractor> StreamTransformer<W, E> {
    pub fn new(sink: W, extractor: E, config: TransformConfig) -> Self {
        StreamTransformer {
            config,
            sink,
            extractor,
            tree: TreePosition::new(),
            open: Vec::new(),
            state: ZoneState::Passthrough,
            pending: Vec::with_capacity(8192),
            anchor: None,
            annotations: String::new(),
            documents_open: 0,
            stats: TransformStats::default(),
        }
    }

    pub fn stats(&self) -> TransformStats {
        self.stats
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Feed every event of `source`, then finish
    pub fn run<S: EventSource>(mut self, mut source: S) -> Result<W> {
        while let Some(event) = source.next_markup()? {
            self.handle(&event)?;
        }
        self.finish()
    }

    /// Process one event
    pub fn handle(&mut self, event: &MarkupEvent<'_>) -> Result<()> {
        match std::mem::take(&mut self.state) {
            ZoneState::Passthrough => self.passthrough(event)?,
            ZoneState::InZone(zone) => self.in_zone(zone, event)?,
            ZoneState::InParagraph(zone, paragraph) => self.in_paragraph(zone, paragraph, event)?,
        }
        self.flush_if_full()
    }

    /// End of input: check that everything closed and write what is left
    pub fn finish(mut self) -> Result<W> {
        match std::mem::take(&mut self.state) {
            ZoneState::InParagraph(_, paragraph) => {
                return Err(Error::UnterminatedParagraph {
                    position: paragraph.position,
                })
            }
            ZoneState::InZone(_) => return Err(Error::UnexpectedEof { open: self.open.len() }),
            ZoneState::Passthrough => {}
        }
        if !self.open.is_empty() {
            return Err(Error::UnexpectedEof { open: self.open.len() });
        }

        self.release_anchor()?;
        self.sink.write_all(&self.pending)?;
        self.pending.clear();
        self.sink.flush()?;

        debug!(
            "{} document(s), {} zone(s), {} annotation(s), {} mention(s) dropped",
            self.stats.documents, self.stats.zones, self.stats.annotations, self.stats.dropped_mentions
        );
        Ok(self.sink)
    }

    // ========================================================================
    // States
    // ========================================================================

    fn passthrough(&mut self, event: &MarkupEvent<'_>) -> Result<()> {
        check_utf8(event)?;
        match &event.event {
            XmlEvent::StartElement(element) => {
                let name = element_name(&element.name, event.position)?;
                self.enter(name);

                if self.is_zone(element) {
                    let opening = OpeningTag::new(markup_str(event)?, name);
                    let path = self.tree.current_path();
                    debug!("citation zone opened at {} (byte {})", path, event.position);
                    self.state = ZoneState::InZone(Zone {
                        index: ParagraphIndex::begin(opening, path, &self.config),
                        depth: self.open.len(),
                    });
                    return Ok(());
                }
                if self.is_marker(name, &self.config.markers.document_element) {
                    self.document_start()?;
                }
                self.emit(&event.raw);
            }
            XmlEvent::EmptyElement(_) => {
                self.tree.enter();
                self.tree.exit();
                self.emit(&event.raw);
            }
            XmlEvent::EndElement(element) => {
                let name = element_name(&element.name, event.position)?;
                self.exit(name, event.position)?;

                if self.is_marker(name, &self.config.markers.anchor_element) {
                    self.hold_anchor(&event.raw)?;
                } else if self.is_marker(name, &self.config.markers.document_element) {
                    self.document_end(&event.raw)?;
                } else {
                    self.emit(&event.raw);
                }
            }
            _ => self.emit(&event.raw),
        }
        Ok(())
    }

    fn in_zone(&mut self, mut zone: Zone, event: &MarkupEvent<'_>) -> Result<()> {
        match &event.event {
            XmlEvent::StartElement(element) => {
                let name = element_name(&element.name, event.position)?;
                self.enter(name);

                if self.is_marker(name, &self.config.markers.paragraph_element) {
                    let opening = OpeningTag::new(markup_str(event)?, name);
                    zone.index.begin_paragraph(opening, self.explicit_id(element));
                    let paragraph = Paragraph {
                        depth: self.open.len(),
                        position: event.position,
                        inline: String::new(),
                    };
                    self.state = ZoneState::InParagraph(zone, paragraph);
                    return Ok(());
                }
            }
            XmlEvent::EmptyElement(element) => {
                self.tree.enter();
                self.tree.exit();

                let name = element_name(&element.name, event.position)?;
                if self.is_marker(name, &self.config.markers.paragraph_element) {
                    let opening = OpeningTag::new(markup_str(event)?, name);
                    zone.index.begin_paragraph(opening, self.explicit_id(element));
                    zone.index.end_paragraph();
                    self.stats.paragraphs += 1;
                }
            }
            XmlEvent::EndElement(element) => {
                let name = element_name(&element.name, event.position)?;
                let closing_depth = self.open.len();
                self.exit(name, event.position)?;

                if closing_depth == zone.depth {
                    return self.finish_zone(zone);
                }
            }
            // Only paragraphs are rebuilt; anything else between them is dropped
            _ => {}
        }
        self.state = ZoneState::InZone(zone);
        Ok(())
    }

    fn in_paragraph(&mut self, mut zone: Zone, mut paragraph: Paragraph, event: &MarkupEvent<'_>) -> Result<()> {
        match &event.event {
            XmlEvent::StartElement(element) => {
                let name = element_name(&element.name, event.position)?;
                self.enter(name);
                paragraph.inline.push_str(markup_str(event)?);
            }
            XmlEvent::EmptyElement(_) => {
                self.tree.enter();
                self.tree.exit();
                paragraph.inline.push_str(markup_str(event)?);
                zone.index.append_raw(&paragraph.inline);
                paragraph.inline.clear();
            }
            XmlEvent::Text(content) | XmlEvent::CData(content) => {
                if paragraph.inline.is_empty() {
                    let text = std::str::from_utf8(content).map_err(|_| Error::InvalidUtf8 {
                        context: "text",
                        position: event.position,
                    })?;
                    zone.index.append_text(text);
                } else {
                    paragraph.inline.push_str(markup_str(event)?);
                }
            }
            XmlEvent::EndElement(element) => {
                let name = element_name(&element.name, event.position)?;
                let zone_name = self.open.get(zone.depth.saturating_sub(1)).map(String::as_str);
                if self.open.last().map(String::as_str) != Some(name) && zone_name == Some(name) {
                    return Err(Error::UnterminatedParagraph {
                        position: paragraph.position,
                    });
                }

                let closing_depth = self.open.len();
                self.exit(name, event.position)?;

                if closing_depth == paragraph.depth {
                    zone.index.end_paragraph();
                    self.stats.paragraphs += 1;
                    self.state = ZoneState::InZone(zone);
                    return Ok(());
                }
                paragraph.inline.push_str(markup_str(event)?);
                zone.index.append_raw(&paragraph.inline);
                paragraph.inline.clear();
            }
            _ => {}
        }
        self.state = ZoneState::InParagraph(zone, paragraph);
        Ok(())
    }

    /// Extract, annotate and emit a closed zone
    fn finish_zone(&mut self, zone: Zone) -> Result<()> {
        let mut index = zone.index;
        self.stats.zones += 1;

        let extraction = match self.extractor.extract(
            index.raw_text(),
            self.config.type_detection,
            self.config.consolidate,
        ) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("citation extraction failed for zone {}: {}", index.zone_path(), e);
                self.stats.failed_extractions += 1;
                Extraction::default()
            }
        };

        if self.documents_open == 0 {
            // No anchor can take them; leave the paragraphs unidentified
            if !extraction.is_empty() {
                warn!(
                    "citation zone {} is outside any document, {} mention(s) discarded",
                    index.zone_path(),
                    extraction.len()
                );
            }
            self.stats.dropped_mentions += extraction.len();
        } else {
            let block = AnnotationBuilder::new(&self.config).build(&extraction, &mut index);
            self.stats.annotations += block.items.len();
            self.stats.dropped_mentions += block.dropped;
            self.annotations.push_str(&block.markup);
        }

        debug!(
            "citation zone {} closed: {} paragraph(s), {} mention(s)",
            index.zone_path(),
            index.paragraphs().len(),
            extraction.len()
        );

        if self.config.layout == Layout::Indented {
            self.pending.push(b'\n');
        }
        self.pending.extend_from_slice(index.render().as_bytes());
        Ok(())
    }

    // ========================================================================
    // Document boundaries and the anchor
    // ========================================================================

    fn document_start(&mut self) -> Result<()> {
        self.documents_open += 1;
        self.release_anchor()
    }

    fn document_end(&mut self, closing: &[u8]) -> Result<()> {
        match self.anchor.take() {
            Some(anchor) => {
                self.sink.write_all(self.annotations.as_bytes())?;
                self.sink.write_all(&anchor)?;
                self.sink.write_all(&self.pending)?;
            }
            None => {
                if !self.annotations.is_empty() {
                    warn!("document has no closed anchor element, annotations placed before its closing tag");
                }
                self.sink.write_all(&self.pending)?;
                self.sink.write_all(self.annotations.as_bytes())?;
            }
        }
        self.sink.write_all(closing)?;
        self.pending.clear();
        self.annotations.clear();
        self.documents_open = self.documents_open.saturating_sub(1);
        self.stats.documents += 1;
        Ok(())
    }

    /// Write everything up to the anchor and keep its closing tag back
    fn hold_anchor(&mut self, closing: &[u8]) -> Result<()> {
        self.release_anchor()?;
        self.sink.write_all(&self.pending)?;
        self.pending.clear();
        self.anchor = Some(closing.to_vec());
        Ok(())
    }

    /// Write a held anchor unchanged, followed by the output that came after it
    fn release_anchor(&mut self) -> Result<()> {
        if let Some(anchor) = self.anchor.take() {
            self.sink.write_all(&anchor)?;
            self.sink.write_all(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }

    fn flush_if_full(&mut self) -> Result<()> {
        if self.anchor.is_none() && self.pending.len() >= self.config.flush_threshold {
            self.sink.write_all(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }

    // ========================================================================
    // Element bookkeeping
    // ========================================================================

    #[inline]
    fn emit(&mut self, raw: &[u8]) {
        self.pending.extend_from_slice(raw);
    }

    fn enter(&mut self, name: &str) {
        self.tree.enter();
        self.open.push(name.to_string());
    }

    fn exit(&mut self, name: &str, position: usize) -> Result<()> {
        match self.open.last() {
            None => Err(Error::UnbalancedEndTag {
                name: name.to_string(),
                position,
            }),
            Some(expected) if expected != name => Err(Error::MismatchedTag {
                expected: expected.clone(),
                found: name.to_string(),
                position,
            }),
            Some(_) => {
                self.open.pop();
                self.tree.exit();
                Ok(())
            }
        }
    }

    #[inline]
    fn is_marker(&self, name: &str, marker: &str) -> bool {
        local_name(name.as_bytes()) == marker.as_bytes()
    }

    fn is_zone(&self, element: &StartElement<'_>) -> bool {
        let markers = &self.config.markers;
        local_name(&element.name) == markers.zone_element.as_bytes()
            && element
                .get_attribute(markers.zone_attribute.as_bytes())
                .is_some_and(|attr| attr.value.as_ref() == markers.zone_value.as_bytes())
    }

    fn explicit_id(&self, element: &StartElement<'_>) -> Option<String> {
        element
            .get_attribute(self.config.markers.id_attribute.as_bytes())
            .and_then(|attr| attr.value_str())
            .map(str::to_string)
    }
}

fn element_name(name: &[u8], position: usize) -> Result<&str> {
    std::str::from_utf8(name).map_err(|_| Error::InvalidUtf8 {
        context: "element name",
        position,
    })
}

/// Passed-through bytes must be UTF-8 like everything else
fn check_utf8(event: &MarkupEvent<'_>) -> Result<()> {
    let context = match event.event {
        XmlEvent::Text(_) | XmlEvent::CData(_) => "text",
        _ => "markup",
    };
    std::str::from_utf8(&event.raw).map_err(|_| Error::InvalidUtf8 {
        context,
        position: event.position,
    })?;
    Ok(())
}

fn markup_str<'e>(event: &'e MarkupEvent<'_>) -> Result<&'e str> {
    std::str::from_utf8(&event.raw).map_err(|_| Error::InvalidUtf8 {
        context: "markup",
        position: event.position,
    })
}
