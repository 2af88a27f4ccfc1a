//! Load ISAPI XML documents into an owned element tree using quick-xml.
//!
//! The tree keeps qualified element names exactly as they appear in the
//! source (`ns1:Color`), so [`normalize`] can strip them again on the way
//! out. Lookups by tag always go through [`Element::local_name`].

#![cfg_attr(docsrs, feature(doc_cfg))]

mod capability;
mod normalize;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::trace;

pub use capability::{parse_capability, Capability};
pub use normalize::{normalize, serialize};

/// Attribute prefix that marks a namespace declaration.
pub const XMLNS_PREFIX: &str = "xmlns";

/// Deepest element nesting [`parse`] accepts.
///
/// Tree walks over parsed documents recurse once per level, so this bounds
/// their stack use. Image-settings documents nest a handful of levels.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not a well-formed XML document.
    #[error("malformed xml: {0}")]
    Malformed(String),
    /// Serialising an element failed.
    #[error("xml write: {0}")]
    Write(String),
    /// The document is well formed but violates an expectation of the caller.
    #[error("invalid document: {0}")]
    Invalid(String),
}

/// One XML element with its attributes, direct text and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written in the source, e.g. `ns1:Color`.
    pub name: String,
    /// Attributes in source order, values unescaped.
    pub attributes: Vec<(String, String)>,
    /// Direct character data with entities resolved.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element with the given qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a complete document and return its root element.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        parse(xml)
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Look up an attribute value by its exact (qualified) name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Concatenated character data of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }

    /// Replace all content with a single text value, dropping child elements.
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.children.clear();
        self.text = value.into();
    }

    /// Resolve a child-index path starting at this element.
    pub fn at(&self, locator: &[usize]) -> Option<&Element> {
        locator
            .iter()
            .try_fold(self, |current, &index| current.children.get(index))
    }

    /// Mutable variant of [`Element::at`].
    pub fn at_mut(&mut self, locator: &[usize]) -> Option<&mut Element> {
        locator
            .iter()
            .try_fold(self, |current, &index| current.children.get_mut(index))
    }

    /// Depth-first pre-order iterator over this element and its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

}

/// Pre-order walk produced by [`Element::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parse a complete XML document into its root [`Element`].
///
/// Declarations, comments, processing instructions and doctypes are
/// dropped. Leaf text is kept verbatim; whitespace-only text between child
/// elements is discarded. Anything that is not a single, properly nested
/// root element is reported as [`XmlError::Malformed`], and nesting beyond
/// [`MAX_DEPTH`] as [`XmlError::Invalid`].
pub fn parse(xml: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.check_end_names(true);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if root.is_some() && stack.is_empty() {
                    return Err(XmlError::Malformed(format!(
                        "second root element at byte {position}"
                    )));
                }
                check_depth(stack.len() + 1, position)?;
                stack.push(open_element(&e)?);
            }
            Ok(Event::Empty(e)) => {
                check_depth(stack.len() + 1, position)?;
                let element = open_element(&e)?;
                attach(&mut stack, &mut root, element, position)?;
            }
            Ok(Event::End(_)) => {
                let mut element = stack.pop().ok_or_else(|| {
                    XmlError::Malformed(format!("unexpected end tag at byte {position}"))
                })?;
                if !element.children.is_empty() && element.text.trim().is_empty() {
                    element.text.clear();
                }
                attach(&mut stack, &mut root, element, position)?;
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|err| XmlError::Malformed(err.to_string()))?;
                push_text(&mut stack, &text, position)?;
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                let text = std::str::from_utf8(&raw)
                    .map_err(|err| XmlError::Malformed(format!("invalid UTF-8: {err}")))?;
                push_text(&mut stack, text, position)?;
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(XmlError::Malformed(format!(
                    "{err} (near byte {})",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Malformed(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    let root = root.ok_or_else(|| XmlError::Malformed("document has no root element".into()))?;
    trace!(root = %root.name, "parsed xml document");
    Ok(root)
}

fn check_depth(depth: usize, position: usize) -> Result<(), XmlError> {
    if depth > MAX_DEPTH {
        return Err(XmlError::Invalid(format!(
            "elements nested deeper than {MAX_DEPTH} levels at byte {position}"
        )));
    }
    Ok(())
}

fn open_element(event: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(event.name().as_ref()));
    for attr in event.attributes() {
        let attr = attr.map_err(|err| XmlError::Malformed(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Malformed(err.to_string()))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    position: usize,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlError::Malformed(format!(
            "second root element at byte {position}"
        )));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str, position: usize) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(XmlError::Malformed(format!(
            "character data outside the root element at byte {position}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_CHANNEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ImageChannel version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
            <id>1</id>
            <enabled>true</enabled>
            <Color>
                <brightnessLevel>50</brightnessLevel>
                <contrastLevel>50</contrastLevel>
            </Color>
            <!-- vendor comment -->
            <WDR><mode>close</mode></WDR>
        </ImageChannel>"#;

    #[test]
    fn parse_image_channel() {
        let root = parse(IMAGE_CHANNEL).expect("parse document");
        assert_eq!(root.name, "ImageChannel");
        assert_eq!(root.attribute("version"), Some("2.0"));
        assert_eq!(root.children.len(), 4);
        let color = &root.children[2];
        assert_eq!(color.local_name(), "Color");
        assert_eq!(color.children[0].text, "50");
        assert!(!color.is_leaf());
        assert!(color.children[1].is_leaf());
    }

    #[test]
    fn prefixed_names_keep_qualified_form() {
        let xml = r#"<ns0:Root xmlns:ns0="urn:a"><ns0:Color><ns0:hue>3</ns0:hue></ns0:Color></ns0:Root>"#;
        let root = parse(xml).expect("parse document");
        assert_eq!(root.name, "ns0:Root");
        assert_eq!(root.local_name(), "Root");
        let hue = root.at(&[0, 0]).expect("hue element");
        assert_eq!(hue.local_name(), "hue");
        assert_eq!(hue.text, "3");
    }

    #[test]
    fn entities_and_cdata_are_resolved() {
        let root = parse("<a><b>x &amp; y</b><c><![CDATA[<raw>]]></c></a>").expect("parse");
        assert_eq!(root.children[0].text, "x & y");
        assert_eq!(root.children[1].text, "<raw>");
    }

    #[test]
    fn malformed_documents_are_rejected() {
        for bad in [
            "",
            "not xml at all",
            "<a><b></a>",
            "<a>",
            "<a/><b/>",
            "<a></a></b>",
            "<a x=\"1\" x=\"2\"/>",
        ] {
            let err = parse(bad).expect_err(bad);
            assert!(matches!(err, XmlError::Malformed(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn locator_navigation_and_set_text() {
        let mut root = parse(IMAGE_CHANNEL).expect("parse");
        assert_eq!(root.at(&[]).map(|el| el.name.as_str()), Some("ImageChannel"));
        assert_eq!(root.at(&[2, 1]).map(|el| el.text.as_str()), Some("50"));
        assert!(root.at(&[2, 9]).is_none());

        let color = root.at_mut(&[2]).expect("color");
        color.set_text("flat");
        assert!(color.is_leaf());
        assert_eq!(root.children[2].text_content(), "flat");
    }

    #[test]
    fn descendants_walk_in_document_order() {
        let root = parse(IMAGE_CHANNEL).expect("parse");
        let names: Vec<_> = root.descendants().map(Element::local_name).collect();
        assert_eq!(
            names,
            [
                "ImageChannel",
                "id",
                "enabled",
                "Color",
                "brightnessLevel",
                "contrastLevel",
                "WDR",
                "mode"
            ]
        );
    }

    fn nested(depth: usize) -> String {
        format!("{}1{}", "<a>".repeat(depth), "</a>".repeat(depth))
    }

    #[test]
    fn nesting_is_bounded() {
        let root = parse(&nested(MAX_DEPTH)).expect("document at the limit");
        assert_eq!(root.descendants().count(), MAX_DEPTH);

        for depth in [MAX_DEPTH + 1, 10_000] {
            let err = parse(&nested(depth)).expect_err("too deep");
            assert!(matches!(err, XmlError::Invalid(_)), "{depth}: {err}");
        }
        let empty_leaf = format!(
            "{}<b/>{}",
            "<a>".repeat(MAX_DEPTH),
            "</a>".repeat(MAX_DEPTH)
        );
        assert!(matches!(parse(&empty_leaf), Err(XmlError::Invalid(_))));
    }

    #[test]
    fn leaf_text_is_kept_verbatim() {
        let root = parse("<a>\n  <name>  Front Door  </name>\n  <b> <c>1</c> </b>\n</a>")
            .expect("parse");
        assert_eq!(root.text, "");
        assert_eq!(root.children[0].text, "  Front Door  ");
        assert_eq!(root.children[1].text, "");
        assert_eq!(root.children[1].children[0].text, "1");
    }
}
