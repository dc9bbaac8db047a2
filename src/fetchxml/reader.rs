//! Minimal element tree over quick-xml's pull reader.
//!
//! FetchXML documents are small, so the whole document is read into an
//! owned tree before translation.

use crate::fetchxml::FetchXmlError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    /// Attributes in document order, values unescaped
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated character data directly inside the element
    pub text: String,
}

impl XmlElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// True when the attribute is present and spelled `true` (or `1`).
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.attr(name), Some(v) if v.eq_ignore_ascii_case("true") || v == "1")
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// A parsed document: comments before the root plus the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub comments: Vec<String>,
    pub root: XmlElement,
}

fn malformed(e: impl std::fmt::Display) -> FetchXmlError {
    FetchXmlError::Malformed(e.to_string())
}

fn open_element(start: &BytesStart<'_>) -> Result<XmlElement, FetchXmlError> {
    let mut element = XmlElement {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..XmlElement::default()
    };
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Hand a finished element to its parent, or make it the root.
fn attach(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<(), FetchXmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(FetchXmlError::Malformed(format!(
                "unexpected second root element <{}>",
                element.name
            )));
        }
        None => *root = Some(element),
    }
    Ok(())
}

/// Read `xml` into an [`XmlDocument`].
///
/// Fails on anything that is not a single well-formed element tree:
/// syntax errors, mismatched or unclosed tags, no root, several roots or
/// text outside the root.
pub fn parse_document(xml: &str) -> Result<XmlDocument, FetchXmlError> {
    // Text is kept untrimmed: `<value>` content is significant
    let mut reader = Reader::from_str(xml);

    let mut comments = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FetchXmlError::Malformed(format!(
                "{} (at byte {})",
                e,
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => {
                let element = open_element(&start)?;
                if stack.is_empty() && root.is_some() {
                    return Err(FetchXmlError::Malformed(format!(
                        "unexpected second root element <{}>",
                        element.name
                    )));
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed(format!("unexpected closing tag </{}>", name)))?;
                if element.name != name {
                    return Err(malformed(format!(
                        "expected </{}>, found </{}>",
                        element.name, name
                    )));
                }
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                match stack.last_mut() {
                    Some(element) => element.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed("text outside the root element")),
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                match stack.last_mut() {
                    Some(element) => element.text.push_str(&text),
                    None => return Err(malformed("CDATA outside the root element")),
                }
            }
            Event::Comment(comment) => {
                if stack.is_empty() && root.is_none() {
                    let body = String::from_utf8_lossy(&comment).trim().to_string();
                    comments.push(body);
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(FetchXmlError::Unclosed(open.name.clone()));
    }
    let root = root.ok_or(FetchXmlError::Empty)?;

    tracing::trace!(root = %root.name, comments = comments.len(), "read XML document");
    Ok(XmlDocument { comments, root })
}
