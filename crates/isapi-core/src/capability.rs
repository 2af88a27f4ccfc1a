//! Tag-keyed lookup of value constraints.

use std::collections::HashMap;

use isapi_xml::{parse_capability, Capability, Element};
use tracing::debug;

/// Lookup from element local name to the constraint advertised for it.
///
/// For every tag the first element in document order decides the outcome,
/// even if that element carries no usable constraint and a later one would.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    by_tag: HashMap<String, Option<Capability>>,
}

impl CapabilityIndex {
    /// Build the index from an optional capabilities document.
    pub fn from_document(document: Option<&Element>) -> Self {
        let mut by_tag = HashMap::new();
        if let Some(document) = document {
            for element in document.descendants() {
                by_tag
                    .entry(element.local_name().to_string())
                    .or_insert_with(|| parse_capability(element));
            }
        }
        let index = Self { by_tag };
        debug!(
            tags = index.by_tag.len(),
            constrained = index.len(),
            "built capability index"
        );
        index
    }

    /// Constraint for `tag`, if the capabilities document declared one.
    pub fn by_tag(&self, tag: &str) -> Option<&Capability> {
        self.by_tag.get(tag).and_then(Option::as_ref)
    }

    /// Number of tags that resolve to a constraint.
    pub fn len(&self) -> usize {
        self.by_tag.values().filter(|cap| cap.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPABILITIES: &str = r#"
        <ImageChannel version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
            <id opt="1">1</id>
            <Color>
                <brightnessLevel min="0" max="100">50</brightnessLevel>
                <contrastLevel min="0" max="100">50</contrastLevel>
            </Color>
            <WDR>
                <mode opt="close,open,auto">close</mode>
                <WDRLevel>50</WDRLevel>
            </WDR>
            <Extra>
                <WDRLevel min="0" max="100"/>
                <mode opt="ignored"/>
            </Extra>
        </ImageChannel>"#;

    fn index() -> CapabilityIndex {
        let doc = isapi_xml::parse(CAPABILITIES).expect("parse capabilities");
        CapabilityIndex::from_document(Some(&doc))
    }

    #[test]
    fn lookup_by_tag() {
        let index = index();
        assert_eq!(
            index.by_tag("brightnessLevel"),
            Some(&Capability::Range { min: 0, max: 100 })
        );
        assert_eq!(
            index.by_tag("mode"),
            Some(&Capability::Options(vec![
                "close".into(),
                "open".into(),
                "auto".into()
            ]))
        );
        assert!(index.by_tag("Color").is_none());
        assert!(index.by_tag("unknown").is_none());
    }

    #[test]
    fn first_element_wins_even_without_constraint() {
        let index = index();
        assert!(index.by_tag("WDRLevel").is_none());
    }

    #[test]
    fn absent_document_gives_empty_index() {
        let index = CapabilityIndex::from_document(None);
        assert!(index.is_empty());
        assert!(index.by_tag("brightnessLevel").is_none());
    }

    #[test]
    fn counts_only_constrained_tags() {
        assert_eq!(index().len(), 4);
    }
}
