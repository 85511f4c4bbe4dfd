//! Citation mentions and the extractor boundary
//!
//! The citation extractor itself is outside this crate. It receives the raw
//! text of one zone and returns typed mentions whose offsets point into that
//! same text. `CitationExtractor` is the seam; `Mention` is what crosses it.

use crate::config::Layout;
use crate::writer::MarkupWriter;

/// Failure reported by an extractor; recovered per zone, never fatal
pub type ExtractError = Box<dyn std::error::Error + Send + Sync>;

/// Kind of citation a mention refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    Patent,
    Bibliographic,
}

/// One citation found in a zone's raw text
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub kind: MentionKind,
    /// Character offset of the mention in the raw text
    pub start: Option<usize>,
    /// Character offset just past the mention
    pub end: Option<usize>,
    /// Citation text as it appears in the document
    pub raw_text: Option<String>,
    /// TEI fragment describing the cited work
    pub markup: Option<String>,
    /// Extractor confidence in `[0, 100]`, `None` when unknown
    pub confidence: Option<f64>,
}

impl Mention {
    /// Patent mention spanning `start..end`
    pub fn patent(start: usize, end: usize, markup: impl Into<String>) -> Self {
        Mention {
            kind: MentionKind::Patent,
            start: Some(start),
            end: Some(end),
            raw_text: None,
            markup: Some(markup.into()),
            confidence: None,
        }
    }

    /// Patent mention described by a parsed patent number
    pub fn from_patent(citation: &PatentCitation, start: usize, end: usize) -> Self {
        Self::patent(start, end, citation.to_tei())
    }

    /// Bibliographic mention starting at `start`
    pub fn bibliographic(start: usize, raw_text: impl Into<String>, markup: impl Into<String>) -> Self {
        Mention {
            kind: MentionKind::Bibliographic,
            start: Some(start),
            end: None,
            raw_text: Some(raw_text.into()),
            markup: Some(markup.into()),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_end(mut self, end: usize) -> Self {
        self.end = Some(end);
        self
    }

    /// Length of the annotated span in characters
    ///
    /// Patents are measured by their offsets, bibliographic references by the
    /// length of their raw citation text; each falls back to the other.
    pub fn length(&self) -> Option<usize> {
        let by_offsets = match (self.start, self.end) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        };
        let by_text = self.raw_text.as_ref().map(|text| text.chars().count());

        match self.kind {
            MentionKind::Patent => by_offsets.or(by_text),
            MentionKind::Bibliographic => by_text.or(by_offsets),
        }
    }
}

/// Everything the extractor found in one zone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub patents: Vec<Mention>,
    pub articles: Vec<Mention>,
}

impl Extraction {
    pub fn new(patents: Vec<Mention>, articles: Vec<Mention>) -> Self {
        Extraction { patents, articles }
    }

    pub fn is_empty(&self) -> bool {
        self.patents.is_empty() && self.articles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patents.len() + self.articles.len()
    }

    /// Patents first, then articles, each in extractor order
    pub fn mentions(&self) -> impl Iterator<Item = &Mention> {
        self.patents.iter().chain(self.articles.iter())
    }
}

/// External citation extractor
pub trait CitationExtractor {
    /// Find citations in the raw text of one zone
    fn extract(&mut self, raw_text: &str, type_detection: bool, consolidate: bool) -> Result<Extraction, ExtractError>;

    /// Release resources at the end of a run
    fn close(&mut self) {}
}

impl<E: CitationExtractor + ?Sized> CitationExtractor for &mut E {
    fn extract(&mut self, raw_text: &str, type_detection: bool, consolidate: bool) -> Result<Extraction, ExtractError> {
        (**self).extract(raw_text, type_detection, consolidate)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<E: CitationExtractor + ?Sized> CitationExtractor for Box<E> {
    fn extract(&mut self, raw_text: &str, type_detection: bool, consolidate: bool) -> Result<Extraction, ExtractError> {
        (**self).extract(raw_text, type_detection, consolidate)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ============================================================================
// Patent citations
// ============================================================================

/// Legal category of a patent document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatentType {
    #[default]
    Patent,
    DesignPatent,
    Plant,
    UtilityModel,
}

impl PatentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatentType::Patent => "patent",
            PatentType::DesignPatent => "designPatent",
            PatentType::Plant => "plant",
            PatentType::UtilityModel => "utilityModel",
        }
    }
}

/// Publication stage of a patent document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicationStatus {
    #[default]
    Publication,
    Application,
    Provisional,
    Reissued,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicationStatus::Publication => "publication",
            PublicationStatus::Application => "application",
            PublicationStatus::Provisional => "provisional",
            PublicationStatus::Reissued => "reissued",
        }
    }
}

/// Offices that grant patents for more than one country
const REGIONAL_AUTHORITIES: [&str; 5] = ["EP", "WO", "XN", "GC", "EA"];

/// A parsed patent reference
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatentCitation {
    /// Issuing office code, e.g. "US" or "EP"
    pub authority: String,
    pub number: String,
    pub kind_code: Option<String>,
    pub patent_type: PatentType,
    pub status: PublicationStatus,
    pub date: Option<String>,
}

impl PatentCitation {
    pub fn new(authority: impl Into<String>, number: impl Into<String>) -> Self {
        PatentCitation {
            authority: authority.into(),
            number: number.into(),
            ..Default::default()
        }
    }

    pub fn with_kind_code(mut self, kind_code: impl Into<String>) -> Self {
        self.kind_code = Some(kind_code.into());
        self
    }

    pub fn with_type(mut self, patent_type: PatentType) -> Self {
        self.patent_type = patent_type;
        self
    }

    pub fn with_status(mut self, status: PublicationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn is_regional(&self) -> bool {
        REGIONAL_AUTHORITIES.contains(&self.authority.as_str())
    }

    /// TEI `biblStruct` for this patent
    pub fn to_tei(&self) -> String {
        let office = if self.is_regional() { "regional" } else { "national" };

        let mut w = MarkupWriter::new(Layout::Compact);
        w.start(
            "biblStruct",
            &[("type", self.patent_type.as_str()), ("status", self.status.as_str())],
        )
        .start("monogr", &[])
        .start("authority", &[])
        .text_element("orgName", &[("type", office)], &self.authority)
        .end()
        .text_element("idno", &[("type", "docNumber")], &self.number);

        if self.kind_code.is_some() || self.date.is_some() {
            w.start("imprint", &[]);
            if let Some(kind_code) = &self.kind_code {
                w.text_element("classCode", &[("scheme", "kindCode")], kind_code);
            }
            if let Some(date) = &self.date {
                w.text_element("date", &[], date);
            }
            w.end();
        }

        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patent_length_from_offsets() {
        let mention = Mention::patent(4, 19, "<biblStruct/>");
        assert_eq!(mention.length(), Some(15));
    }

    #[test]
    fn test_bibliographic_length_from_raw_text() {
        let mention = Mention::bibliographic(3, "Smith, Nature 1999", "<biblStruct/>").with_end(5);
        assert_eq!(mention.length(), Some(18));
    }

    #[test]
    fn test_length_fallbacks() {
        let mut mention = Mention::bibliographic(0, "x", "<bibl/>");
        mention.raw_text = None;
        assert_eq!(mention.length(), None);
        assert_eq!(mention.with_end(7).length(), Some(7));

        let mut patent = Mention::patent(10, 2, "<bibl/>");
        assert_eq!(patent.length(), None);
        patent.raw_text = Some("EP 1 234".to_string());
        assert_eq!(patent.length(), Some(8));
    }

    #[test]
    fn test_extraction_order() {
        let extraction = Extraction::new(
            vec![Mention::patent(9, 10, "p")],
            vec![Mention::bibliographic(1, "a", "b")],
        );
        let kinds: Vec<_> = extraction.mentions().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MentionKind::Patent, MentionKind::Bibliographic]);
        assert_eq!(extraction.len(), 2);
        assert!(Extraction::default().is_empty());
    }

    #[test]
    fn test_patent_tei_minimal() {
        let citation = PatentCitation::new("EP", "1234567");
        assert_eq!(
            citation.to_tei(),
            "<biblStruct type=\"patent\" status=\"publication\"><monogr><authority><orgName type=\"regional\">EP</orgName></authority><idno type=\"docNumber\">1234567</idno></monogr></biblStruct>"
        );
    }

    #[test]
    fn test_patent_tei_with_imprint() {
        let citation = PatentCitation::new("US", "8303618")
            .with_kind_code("B2")
            .with_type(PatentType::DesignPatent)
            .with_status(PublicationStatus::Application)
            .with_date("2012-11-06");
        assert!(!citation.is_regional());
        assert_eq!(
            citation.to_tei(),
            "<biblStruct type=\"designPatent\" status=\"application\"><monogr><authority><orgName type=\"national\">US</orgName></authority><idno type=\"docNumber\">8303618</idno><imprint><classCode scheme=\"kindCode\">B2</classCode><date>2012-11-06</date></imprint></monogr></biblStruct>"
        );
    }

    #[test]
    fn test_mention_from_patent() {
        let mention = Mention::from_patent(&PatentCitation::new("WO", "2004/000001"), 0, 14);
        assert_eq!(mention.kind, MentionKind::Patent);
        assert!(mention.markup.unwrap().contains("<orgName type=\"regional\">WO</orgName>"));
    }
}
