//! Markup events
//!
//! What the readers hand to the transformer. Every event travels
//! together with the exact source bytes it was parsed from, so consumers can
//! forward untouched markup byte for byte.

use crate::core::attributes::{find_attribute, local_name, Attribute};
use std::borrow::Cow;

/// One parsed construct
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// `<name attrs...>`
    StartElement(StartElement<'a>),
    /// `</name>`
    EndElement(EndElement<'a>),
    /// `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    /// Text content between tags (entities decoded)
    Text(Cow<'a, [u8]>),
    /// CDATA section content
    CData(Cow<'a, [u8]>),
    Comment(Cow<'a, [u8]>),
    /// `<?target data?>`, other than the XML declaration
    ProcessingInstruction {
        target: Cow<'a, [u8]>,
        data: Option<Cow<'a, [u8]>>,
    },
    XmlDeclaration {
        version: Cow<'a, [u8]>,
        encoding: Option<Cow<'a, [u8]>>,
        standalone: Option<bool>,
    },
    /// Everything between `<!DOCTYPE` and the closing `>`
    DocType(Cow<'a, [u8]>),
}

/// An event plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupEvent<'a> {
    pub event: XmlEvent<'a>,
    /// Verbatim source bytes of the event
    pub raw: Cow<'a, [u8]>,
    /// Absolute byte offset of the event in the input stream
    pub position: usize,
}

impl<'a> MarkupEvent<'a> {
    /// Detach from the input buffer
    pub fn into_owned(self) -> MarkupEvent<'static> {
        MarkupEvent {
            event: self.event.into_owned(),
            raw: Cow::Owned(self.raw.into_owned()),
            position: self.position,
        }
    }
}

/// Name and attributes of a start or empty tag
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    /// Qualified name, prefix included
    pub name: Cow<'a, [u8]>,
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a [u8], attributes: Vec<Attribute<'a>>) -> Self {
        Self::from_cow(Cow::Borrowed(name), attributes)
    }

    /// Start element around an already decoded or owned name
    pub fn from_cow(name: Cow<'a, [u8]>, attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &[u8] {
        local_name(self.name.as_ref())
    }

    /// Attribute by qualified name
    pub fn get_attribute(&self, name: &[u8]) -> Option<&Attribute<'a>> {
        find_attribute(&self.attributes, name)
    }

    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.get_attribute(name.as_bytes()).and_then(|a| a.value_str())
    }

    pub fn into_owned(self) -> StartElement<'static> {
        StartElement {
            name: Cow::Owned(self.name.into_owned()),
            attributes: self.attributes.into_iter().map(Attribute::into_owned).collect(),
        }
    }
}

/// Name of an end tag
#[derive(Debug, Clone, PartialEq)]
pub struct EndElement<'a> {
    pub name: Cow<'a, [u8]>,
}

impl<'a> EndElement<'a> {
    pub fn new(name: &'a [u8]) -> Self {
        EndElement {
            name: Cow::Borrowed(name),
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    /// Name without its namespace prefix
    pub fn local_name(&self) -> &[u8] {
        local_name(self.name.as_ref())
    }

    pub fn into_owned(self) -> EndElement<'static> {
        EndElement {
            name: Cow::Owned(self.name.into_owned()),
        }
    }
}

fn own(bytes: Cow<'_, [u8]>) -> Cow<'static, [u8]> {
    Cow::Owned(bytes.into_owned())
}

impl<'a> XmlEvent<'a> {
    /// Character data of a text or CDATA event
    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            XmlEvent::Text(t) | XmlEvent::CData(t) => Some(t.as_ref()),
            _ => None,
        }
    }

    /// Detach from the input buffer
    pub fn into_owned(self) -> XmlEvent<'static> {
        match self {
            XmlEvent::StartElement(e) => XmlEvent::StartElement(e.into_owned()),
            XmlEvent::EndElement(e) => XmlEvent::EndElement(e.into_owned()),
            XmlEvent::EmptyElement(e) => XmlEvent::EmptyElement(e.into_owned()),
            XmlEvent::Text(t) => XmlEvent::Text(own(t)),
            XmlEvent::CData(t) => XmlEvent::CData(own(t)),
            XmlEvent::Comment(t) => XmlEvent::Comment(own(t)),
            XmlEvent::ProcessingInstruction { target, data } => XmlEvent::ProcessingInstruction {
                target: own(target),
                data: data.map(own),
            },
            XmlEvent::XmlDeclaration {
                version,
                encoding,
                standalone,
            } => XmlEvent::XmlDeclaration {
                version: own(version),
                encoding: encoding.map(own),
                standalone,
            },
            XmlEvent::DocType(t) => XmlEvent::DocType(own(t)),
        }
    }
}
