//! Paragraph ledger of one citation zone
//!
//! `ParagraphIndex` rebuilds the plain text of a zone while its events stream
//! by, remembers where each paragraph starts and ends in that text, and later
//! maps mention offsets back to paragraph-relative pointers. One index lives
//! for exactly one zone; the transformer builds a fresh one per zone.
//!
//! All offsets count characters (Unicode scalar values) of the raw text, the
//! unit in which mentions are reported.

use crate::config::{Layout, TransformConfig};
use crate::core::entities::{collapse_whitespace, escape_attribute, escape_text, needs_escape};
use std::fmt;

/// Source form of an opening tag, kept to re-emit it unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningTag {
    raw: String,
    name: String,
}

impl OpeningTag {
    /// `raw` is the verbatim tag (`<p n="1">` or `<p/>`), `name` its qualified name
    pub fn new(raw: impl Into<String>, name: impl Into<String>) -> Self {
        OpeningTag {
            raw: raw.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write the tag in open form, optionally adding one attribute
    fn write_open(&self, out: &mut String, extra: Option<(&str, &str)>) {
        let head = match self.raw.strip_suffix("/>") {
            Some(head) => head.trim_end(),
            None => self.raw.strip_suffix('>').unwrap_or(&self.raw),
        };
        out.push_str(head);
        if let Some((name, value)) = extra {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        out.push('>');
    }

    fn write_close(&self, out: &mut String) {
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Position of a mention inside one paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    pub paragraph_id: String,
    pub offset: usize,
    pub length: usize,
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#string-range('{}',{},{})", self.paragraph_id, self.offset, self.length)
    }
}

/// One paragraph of the zone
#[derive(Debug, Clone)]
pub struct ParagraphRecord {
    opening: OpeningTag,
    explicit_id: Option<String>,
    synthetic_id: Option<String>,
    resolved: bool,
    /// Character range `[start, end]` in the raw text
    start: usize,
    end: usize,
    /// Same range in bytes, for slicing
    byte_start: usize,
    byte_end: usize,
}

impl ParagraphRecord {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Identifier written for this paragraph, if it has one
    pub fn id(&self) -> Option<&str> {
        self.explicit_id.as_deref().or(self.synthetic_id.as_deref())
    }

    #[inline]
    fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// Raw text and paragraph ranges of one citation zone
#[derive(Debug)]
pub struct ParagraphIndex {
    zone: OpeningTag,
    /// Tree address of the zone element
    zone_path: String,
    layout: Layout,
    id_attribute: String,
    raw: String,
    char_len: usize,
    paragraphs: Vec<ParagraphRecord>,
    current: Option<ParagraphRecord>,
}

impl ParagraphIndex {
    /// Start the index of a zone opened by `zone` at tree address `zone_path`
    pub fn begin(zone: OpeningTag, zone_path: impl Into<String>, config: &TransformConfig) -> Self {
        ParagraphIndex {
            zone,
            zone_path: zone_path.into(),
            layout: config.layout,
            id_attribute: config.markers.id_attribute.clone(),
            raw: String::new(),
            char_len: 0,
            paragraphs: Vec::new(),
            current: None,
        }
    }

    /// Open a paragraph at the current end of the raw text
    pub fn begin_paragraph(&mut self, opening: OpeningTag, explicit_id: Option<String>) {
        self.current = Some(ParagraphRecord {
            opening,
            explicit_id,
            synthetic_id: None,
            resolved: false,
            start: self.char_len,
            end: self.char_len,
            byte_start: self.raw.len(),
            byte_end: self.raw.len(),
        });
    }

    /// True between `begin_paragraph` and `end_paragraph`
    pub fn in_paragraph(&self) -> bool {
        self.current.is_some()
    }

    /// Append decoded character data
    ///
    /// Text containing markup characters is escaped; otherwise whitespace
    /// runs are collapsed to a single space.
    pub fn append_text(&mut self, content: &str) {
        if needs_escape(content) {
            let escaped = escape_text(content);
            self.push_raw(&escaped);
        } else {
            let collapsed = collapse_whitespace(content);
            self.push_raw(&collapsed);
        }
    }

    /// Append serialized markup as is
    pub fn append_raw(&mut self, markup: &str) {
        self.push_raw(markup);
    }

    fn push_raw(&mut self, content: &str) {
        self.raw.push_str(content);
        self.char_len += content.chars().count();
    }

    /// Close the current paragraph and append the separator space
    ///
    /// Returns false when no paragraph was open.
    pub fn end_paragraph(&mut self) -> bool {
        let Some(mut record) = self.current.take() else {
            return false;
        };
        record.end = self.char_len;
        record.byte_end = self.raw.len();
        self.push_raw(" ");
        self.paragraphs.push(record);
        true
    }

    /// Raw text of the zone, as handed to the extractor
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn paragraphs(&self) -> &[ParagraphRecord] {
        &self.paragraphs
    }

    pub fn zone_path(&self) -> &str {
        &self.zone_path
    }

    /// Map a mention at `offset` of `length` characters to its paragraph
    ///
    /// The first paragraph whose range contains `offset`, ends included,
    /// wins. A paragraph without an explicit identifier gets a synthetic one
    /// from the zone address and its 1-based position in the zone.
    pub fn resolve(&mut self, offset: usize, length: usize) -> Option<Pointer> {
        let index = self.paragraphs.iter().position(|p| p.contains(offset))?;
        let zone_path = &self.zone_path;
        let record = &mut self.paragraphs[index];
        record.resolved = true;

        let paragraph_id = match &record.explicit_id {
            Some(id) => id.clone(),
            None => record
                .synthetic_id
                .get_or_insert_with(|| synthetic_id(zone_path, index + 1))
                .clone(),
        };

        Some(Pointer {
            paragraph_id,
            offset: offset - record.start,
            length,
        })
    }

    /// Reconstructed zone markup
    ///
    /// Paragraph tags keep their source form; a paragraph that was pointed
    /// at and had no identifier gains the synthetic one.
    pub fn render(&self) -> String {
        let indented = self.layout == Layout::Indented;
        let mut out = String::with_capacity(self.raw.len() + 64 * (self.paragraphs.len() + 1));

        self.zone.write_open(&mut out, None);
        if indented {
            out.push('\n');
        }

        for record in &self.paragraphs {
            if indented {
                out.push_str("  ");
            }
            let extra = match (&record.explicit_id, &record.synthetic_id) {
                (None, Some(id)) if record.resolved => Some((self.id_attribute.as_str(), id.as_str())),
                _ => None,
            };
            record.opening.write_open(&mut out, extra);
            out.push_str(&self.raw[record.byte_start..record.byte_end]);
            record.opening.write_close(&mut out);
            if indented {
                out.push('\n');
            }
        }

        self.zone.write_close(&mut out);
        out
    }
}

fn synthetic_id(zone_path: &str, position: usize) -> String {
    if zone_path.is_empty() {
        position.to_string()
    } else {
        format!("{}.{}", zone_path, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(config: &TransformConfig, path: &str) -> ParagraphIndex {
        ParagraphIndex::begin(OpeningTag::new("<div type=\"description\">", "div"), path, config)
    }

    fn paragraph(index: &mut ParagraphIndex, text: &str) {
        index.begin_paragraph(OpeningTag::new("<p>", "p"), None);
        index.append_text(text);
        index.end_paragraph();
    }

    #[test]
    fn test_paragraph_ranges_and_separator() {
        let mut index = zone(&TransformConfig::default(), "1.2.2");
        paragraph(&mut index, "ab");
        paragraph(&mut index, "cdefghi");

        assert_eq!(index.raw_text(), "ab cdefghi ");
        let ranges: Vec<_> = index.paragraphs().iter().map(|p| (p.start(), p.end())).collect();
        assert_eq!(ranges, vec![(0, 2), (3, 10)]);
    }

    #[test]
    fn test_resolve_synthetic_id() {
        let mut index = zone(&TransformConfig::default(), "1.2.2");
        paragraph(&mut index, "ab");
        paragraph(&mut index, "cdefghi");

        let pointer = index.resolve(3, 1).unwrap();
        assert_eq!(pointer.to_string(), "#string-range('1.2.2.2',0,1)");
        assert!(index.paragraphs()[1].is_resolved());
        assert!(!index.paragraphs()[0].is_resolved());
    }

    #[test]
    fn test_resolve_explicit_id() {
        let mut index = zone(&TransformConfig::default(), "1.2.2");
        paragraph(&mut index, "ab");
        index.begin_paragraph(OpeningTag::new("<p xml:id=\"ID\">", "p"), Some("ID".to_string()));
        index.append_text("cdefghi");
        index.end_paragraph();

        assert_eq!(index.resolve(3, 1).unwrap().to_string(), "#string-range('ID',0,1)");
        assert_eq!(index.paragraphs()[1].id(), Some("ID"));
    }

    #[test]
    fn test_resolve_bounds_are_inclusive() {
        let mut index = zone(&TransformConfig::default(), "1");
        paragraph(&mut index, "abc");
        paragraph(&mut index, "de");

        // [0,3] and [4,6]
        for offset in 0..=3 {
            let pointer = index.resolve(offset, 1).unwrap();
            assert_eq!(pointer.paragraph_id, "1.1");
            assert_eq!(pointer.offset, offset);
        }
        assert_eq!(index.resolve(4, 2).unwrap().paragraph_id, "1.2");
        assert_eq!(index.resolve(6, 2).unwrap().offset, 2);
        assert!(index.resolve(7, 1).is_none());
        assert!(index.resolve(100, 1).is_none());
    }

    #[test]
    fn test_resolve_without_paragraphs() {
        let mut index = zone(&TransformConfig::default(), "1");
        assert!(index.resolve(0, 1).is_none());
    }

    #[test]
    fn test_escaping_and_whitespace() {
        let mut index = zone(&TransformConfig::default(), "1");
        index.begin_paragraph(OpeningTag::new("<p>", "p"), None);
        index.append_text("a  \n b");
        index.append_text(" x < y  &  \"z\"");
        index.end_paragraph();
        // whitespace is only collapsed on the unescaped path
        assert_eq!(index.raw_text(), "a b x &lt; y  &amp;  &quot;z&quot; ");
    }

    #[test]
    fn test_offsets_count_characters() {
        let mut index = zone(&TransformConfig::default(), "1");
        paragraph(&mut index, "Café crème");
        paragraph(&mut index, "naïve");
        assert_eq!(index.paragraphs()[1].start(), 11);
        let pointer = index.resolve(13, 3).unwrap();
        assert_eq!((pointer.paragraph_id.as_str(), pointer.offset), ("1.2", 2));
        assert!(index.render().ends_with("<p>Café crème</p><p xml:id=\"1.2\">naïve</p></div>"));
    }

    #[test]
    fn test_synthetic_id_is_stable() {
        let mut index = zone(&TransformConfig::default(), "3.1");
        paragraph(&mut index, "one two three");
        let first = index.resolve(0, 3).unwrap();
        let second = index.resolve(8, 5).unwrap();
        assert_eq!(first.paragraph_id, second.paragraph_id);
        assert_eq!(second.offset, 8);
    }

    #[test]
    fn test_render_compact_adds_id_only_when_resolved() {
        let mut index = zone(&TransformConfig::default(), "1.4");
        paragraph(&mut index, "first");
        paragraph(&mut index, "second");
        index.resolve(7, 2);
        assert_eq!(
            index.render(),
            "<div type=\"description\"><p>first</p><p xml:id=\"1.4.2\">second</p></div>"
        );
    }

    #[test]
    fn test_render_indented() {
        let config = TransformConfig::default().with_layout(Layout::Indented);
        let mut index = zone(&config, "1");
        index.begin_paragraph(OpeningTag::new("<p id=\"someId\">", "p"), None);
        index.append_text("content");
        index.end_paragraph();
        assert_eq!(index.render(), "<div type=\"description\">\n  <p id=\"someId\">content</p>\n</div>");
    }

    #[test]
    fn test_render_keeps_source_tags_and_opens_empty_paragraph() {
        let mut index = ParagraphIndex::begin(
            OpeningTag::new("<tei:div type='description' n=\"2\">", "tei:div"),
            "1",
            &TransformConfig::default(),
        );
        index.begin_paragraph(OpeningTag::new("<tei:p rend=\"x\" />", "tei:p"), None);
        index.end_paragraph();
        index.resolve(0, 0);
        assert_eq!(
            index.render(),
            "<tei:div type='description' n=\"2\"><tei:p rend=\"x\" xml:id=\"1.1\"></tei:p></tei:div>"
        );
    }

    #[test]
    fn test_raw_content_is_not_escaped() {
        let mut index = zone(&TransformConfig::default(), "1");
        index.begin_paragraph(OpeningTag::new("<p>", "p"), None);
        index.append_text("see ");
        index.append_raw("<hi rend=\"italic\">Nature</hi>");
        index.end_paragraph();
        assert_eq!(index.raw_text(), "see <hi rend=\"italic\">Nature</hi> ");
        assert!(!index.in_paragraph());
        assert!(!index.end_paragraph());
    }
}
