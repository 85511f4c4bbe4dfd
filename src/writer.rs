//! Markup builder for generated TEI fragments
//!
//! Writes elements into a `String`, escaping attribute values and text.
//! In indented layout every element starts on its own line, three spaces per
//! nesting level; an element holding only text stays on one line. Embedded
//! raw fragments are placed on their own line but not re-indented.

use crate::config::Layout;
use crate::core::entities::{escape_attribute, escape_text};

const INDENT: &str = "   ";

/// Streaming builder for well-nested markup
pub struct MarkupWriter {
    buf: String,
    layout: Layout,
    open: Vec<String>,
}

impl MarkupWriter {
    pub fn new(layout: Layout) -> Self {
        MarkupWriter {
            buf: String::with_capacity(512),
            layout,
            open: Vec::new(),
        }
    }

    /// Start a new line at the current depth (indented layout only)
    fn line(&mut self) {
        if self.layout == Layout::Indented {
            if !self.buf.is_empty() {
                self.buf.push('\n');
            }
            for _ in 0..self.open.len() {
                self.buf.push_str(INDENT);
            }
        }
    }

    fn push_tag(&mut self, name: &str, attributes: &[(&str, &str)]) {
        self.buf.push('<');
        self.buf.push_str(name);
        for (attr_name, attr_value) in attributes {
            self.buf.push(' ');
            self.buf.push_str(attr_name);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape_attribute(attr_value));
            self.buf.push('"');
        }
    }

    /// Open an element
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> &mut Self {
        self.line();
        self.push_tag(name, attributes);
        self.buf.push('>');
        self.open.push(name.to_string());
        self
    }

    /// Close the innermost open element
    pub fn end(&mut self) -> &mut Self {
        if let Some(name) = self.open.pop() {
            self.line();
            self.buf.push_str("</");
            self.buf.push_str(&name);
            self.buf.push('>');
        }
        self
    }

    /// Write an element without content
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> &mut Self {
        self.line();
        self.push_tag(name, attributes);
        self.buf.push_str("/>");
        self
    }

    /// Write an element holding only escaped text
    pub fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> &mut Self {
        self.line();
        self.push_tag(name, attributes);
        self.buf.push('>');
        self.buf.push_str(&escape_text(text));
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    /// Embed an already serialized fragment
    pub fn raw(&mut self, markup: &str) -> &mut Self {
        self.line();
        self.buf.push_str(markup.trim_end());
        self
    }

    /// Close any open element and return the markup
    pub fn finish(mut self) -> String {
        while !self.open.is_empty() {
            self.end();
        }
        if self.layout == Layout::Indented && !self.buf.is_empty() {
            self.buf.push('\n');
        }
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(layout: Layout) -> String {
        let mut w = MarkupWriter::new(layout);
        w.start("list", &[("type", "a&b")])
            .start("item", &[])
            .empty("date", &[("when", "2024-01-02")])
            .text_element("label", &[], "x < y")
            .raw("<bibl/>")
            .end();
        w.finish()
    }

    #[test]
    fn test_compact() {
        assert_eq!(
            sample(Layout::Compact),
            "<list type=\"a&amp;b\"><item><date when=\"2024-01-02\"/><label>x &lt; y</label><bibl/></item></list>"
        );
    }

    #[test]
    fn test_indented() {
        assert_eq!(
            sample(Layout::Indented),
            "<list type=\"a&amp;b\">\n   <item>\n      <date when=\"2024-01-02\"/>\n      <label>x &lt; y</label>\n      <bibl/>\n   </item>\n</list>\n"
        );
    }

    #[test]
    fn test_empty_writer() {
        assert_eq!(MarkupWriter::new(Layout::Indented).finish(), "");
    }
}
