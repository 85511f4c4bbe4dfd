//! Transformer configuration
//!
//! A `TransformConfig` is set once per transformer instance. All fields have
//! defaults matching standard TEI output, so `TransformConfig::default()` is
//! usable as is.

use crate::reader::chunked::DEFAULT_CHUNK_SIZE;
use chrono::NaiveDate;

/// Output layout of generated markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// No whitespace between generated elements
    #[default]
    Compact,
    /// One element per line, indented
    Indented,
}

/// Element and attribute names the transformer reacts to
///
/// Element names are matched on their local part; attribute names are
/// matched as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeiMarkers {
    /// Element opening a citation zone
    pub zone_element: String,
    /// Attribute and value the zone element must carry
    pub zone_attribute: String,
    pub zone_value: String,
    /// Paragraph element inside a zone
    pub paragraph_element: String,
    /// Element closing one document of the stream
    pub document_element: String,
    /// Container whose closing tag anchors the annotation block
    pub anchor_element: String,
    /// Identity attribute of paragraphs, read and written
    pub id_attribute: String,
}

impl Default for TeiMarkers {
    fn default() -> Self {
        Self {
            zone_element: "div".to_string(),
            zone_attribute: "type".to_string(),
            zone_value: "description".to_string(),
            paragraph_element: "p".to_string(),
            document_element: "TEI".to_string(),
            anchor_element: "notesStmt".to_string(),
            id_attribute: "xml:id".to_string(),
        }
    }
}

/// Software attribution written into every annotation item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    pub ident: String,
    pub version: String,
    pub label: String,
}

impl Default for ApplicationInfo {
    fn default() -> Self {
        Self {
            ident: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            label: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

/// Per-run settings of the stream transformer
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    pub layout: Layout,
    /// Forwarded to the extractor
    pub type_detection: bool,
    /// Forwarded to the extractor
    pub consolidate: bool,
    pub markers: TeiMarkers,
    pub application: ApplicationInfo,
    /// Fixed date stamp for annotation items; today's date when unset
    pub annotation_date: Option<NaiveDate>,
    /// Emit a `certainty` element inside each item's author
    pub emit_certainty: bool,
    /// Read size of the chunked reader
    pub chunk_size: usize,
    /// Buffered output size that triggers a write while no anchor is held
    pub flush_threshold: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Compact,
            type_detection: true,
            consolidate: false,
            markers: TeiMarkers::default(),
            application: ApplicationInfo::default(),
            annotation_date: None,
            emit_certainty: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            flush_threshold: 64 * 1024,
        }
    }
}

impl TransformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_type_detection(mut self, enabled: bool) -> Self {
        self.type_detection = enabled;
        self
    }

    pub fn with_consolidation(mut self, enabled: bool) -> Self {
        self.consolidate = enabled;
        self
    }

    pub fn with_markers(mut self, markers: TeiMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_application(mut self, application: ApplicationInfo) -> Self {
        self.application = application;
        self
    }

    pub fn with_annotation_date(mut self, date: NaiveDate) -> Self {
        self.annotation_date = Some(date);
        self
    }

    pub fn with_certainty(mut self, enabled: bool) -> Self {
        self.emit_certainty = enabled;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_flush_threshold(mut self, bytes: usize) -> Self {
        self.flush_threshold = bytes;
        self
    }

    /// Date stamp for annotation items, `YYYY-MM-DD`
    pub fn date_stamp(&self) -> String {
        self.annotation_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
            .format("%Y-%m-%d")
            .to_string()
    }
}
