//! Serialise elements back to text, optionally without namespaces.

use std::io::Cursor;
use std::sync::LazyLock;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use tracing::trace;

use crate::{Element, XmlError, XMLNS_PREFIX};

static PREFIXED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)\w+:(\w+)").expect("valid regex"));

static NAMESPACE_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sxmlns(:\w+)?="[^"]*""#).expect("valid regex"));

/// Serialise an element subtree exactly as stored (names and attributes untouched).
pub fn serialize(element: &Element) -> Result<String, XmlError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_element(&mut writer, element)?;
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|err| XmlError::Write(format!("invalid UTF-8: {err}")))
}

/// Serialise a subtree to plain XML with all namespace information removed.
///
/// The source element is left untouched: namespace declarations are removed
/// from a deep copy, and prefixed tag names are rewritten in the resulting
/// text (`<ns1:Color>` becomes `<Color>`).
pub fn normalize(element: &Element) -> Result<String, XmlError> {
    let mut copy = element.clone();
    strip_namespace_attributes(&mut copy);
    let raw = serialize(&copy)?;
    let unprefixed = PREFIXED_TAG.replace_all(&raw, "<${1}${2}");
    let cleaned = NAMESPACE_DECLARATION.replace_all(&unprefixed, "");
    trace!(root = %element.name, bytes = cleaned.len(), "normalized element");
    Ok(cleaned.into_owned())
}

fn strip_namespace_attributes(element: &mut Element) {
    element
        .attributes
        .retain(|(key, _)| !key.starts_with(XMLNS_PREFIX));
    for child in &mut element.children {
        strip_namespace_attributes(child);
    }
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &Element,
) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() && element.text.is_empty() {
        return write_event(writer, Event::Empty(start));
    }
    write_event(writer, Event::Start(start))?;
    if !element.text.is_empty() {
        write_event(writer, Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    write_event(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|err| XmlError::Write(err.to_string()))
}
