//! Standoff annotation items
//!
//! Turns the mentions of one zone into `item` elements pointing into the
//! zone's paragraphs. Mentions that cannot be placed are logged and skipped;
//! they never fail the zone.

use super::mention::{Extraction, Mention, MentionKind};
use super::paragraph::ParagraphIndex;
use crate::config::TransformConfig;
use crate::writer::MarkupWriter;
use log::{debug, warn};

/// Confidence bucket of a mention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Certainty {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
    Unknown,
}

impl Certainty {
    /// Bucket a `[0, 100]` score; buckets are closed on their upper bound
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if (0.0..=20.0).contains(&s) => Certainty::VeryLow,
            Some(s) if s > 20.0 && s <= 40.0 => Certainty::Low,
            Some(s) if s > 40.0 && s <= 60.0 => Certainty::Medium,
            Some(s) if s > 60.0 && s <= 80.0 => Certainty::High,
            Some(s) if s > 80.0 && s <= 100.0 => Certainty::VeryHigh,
            _ => Certainty::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Certainty::VeryLow => "very low",
            Certainty::Low => "low",
            Certainty::Medium => "medium",
            Certainty::High => "high",
            Certainty::VeryHigh => "very high",
            Certainty::Unknown => "no certainty",
        }
    }
}

/// One serialized annotation item
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationItem {
    pub kind: MentionKind,
    /// Rendered pointer, `#string-range('id',offset,length)`
    pub target: String,
    pub certainty: Certainty,
}

/// Annotation markup of one zone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationBlock {
    /// The `note` element, or empty when no mention resolved
    pub markup: String,
    pub items: Vec<AnnotationItem>,
    /// Mentions skipped for missing data or an unresolvable offset
    pub dropped: usize,
}

impl AnnotationBlock {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds the annotation block of a zone
pub struct AnnotationBuilder<'c> {
    config: &'c TransformConfig,
    date: String,
}

impl<'c> AnnotationBuilder<'c> {
    pub fn new(config: &'c TransformConfig) -> Self {
        AnnotationBuilder {
            config,
            date: config.date_stamp(),
        }
    }

    /// Resolve every mention against `index` and serialize the ones that land in a paragraph
    pub fn build(&self, extraction: &Extraction, index: &mut ParagraphIndex) -> AnnotationBlock {
        let mut block = AnnotationBlock::default();
        if extraction.is_empty() {
            return block;
        }

        let mut w = MarkupWriter::new(self.config.layout);
        w.start(
            "note",
            &[("type", "standoff-annotation"), ("subtype", "automatic-annotation")],
        )
        .start("list", &[("type", "automatic-annotation")]);

        for mention in extraction.mentions() {
            match self.write_item(&mut w, mention, index) {
                Some(item) => block.items.push(item),
                None => block.dropped += 1,
            }
        }

        debug!(
            "zone {}: {} annotation(s), {} mention(s) dropped",
            index.zone_path(),
            block.items.len(),
            block.dropped
        );

        if !block.items.is_empty() {
            block.markup = w.finish();
        }
        block
    }

    fn write_item(&self, w: &mut MarkupWriter, mention: &Mention, index: &mut ParagraphIndex) -> Option<AnnotationItem> {
        let (Some(start), Some(markup)) = (mention.start, mention.markup.as_deref()) else {
            warn!("{:?} mention without offset or markup, skipped", mention.kind);
            return None;
        };
        let Some(length) = mention.length() else {
            warn!("{:?} mention at {} has no measurable length, skipped", mention.kind, start);
            return None;
        };
        let Some(pointer) = index.resolve(start, length) else {
            warn!(
                "{:?} mention at {} (length {}) is outside every paragraph of zone {}, skipped",
                mention.kind,
                start,
                length,
                index.zone_path()
            );
            return None;
        };

        let certainty = Certainty::from_score(mention.confidence);
        let target = pointer.to_string();
        let app = &self.config.application;

        w.start("item", &[])
            .empty("date", &[("when", self.date.as_str())])
            .start("author", &[("type", "software")])
            .start("appInfo", &[])
            .start(
                "application",
                &[("version", app.version.as_str()), ("ident", app.ident.as_str())],
            )
            .text_element("label", &[], &app.label)
            .end()
            .end();
        if self.config.emit_certainty {
            let cert = mention.confidence.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string());
            w.start("certainty", &[("cert", cert.as_str())])
                .text_element("label", &[], certainty.label())
                .end();
        }
        w.end().raw(markup).empty("ptr", &[("target", target.as_str())]).end();

        Some(AnnotationItem {
            kind: mention.kind,
            target,
            certainty,
        })
    }
}
