//! Value constraints advertised by the `/capabilities` document.

use std::fmt;

use crate::Element;

/// Constraint on the values a leaf accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Capability {
    /// Inclusive integer range from `min`/`max` attributes.
    Range { min: i64, max: i64 },
    /// Enumerated options from an `opt`/`options` attribute, never empty.
    Options(Vec<String>),
}

impl Capability {
    pub fn is_range(&self) -> bool {
        matches!(self, Capability::Range { .. })
    }

    /// Whether `value` lies inside the advertised constraint.
    pub fn admits(&self, value: &str) -> bool {
        match self {
            Capability::Range { min, max } => value
                .trim()
                .parse::<i64>()
                .map(|v| (*min..=*max).contains(&v))
                .unwrap_or(false),
            Capability::Options(options) => options.iter().any(|opt| opt == value),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Range { min, max } => write!(f, "range {min}..={max}"),
            Capability::Options(options) => write!(f, "one of {}", options.join(", ")),
        }
    }
}

/// Extract a constraint from a capability element's attributes.
///
/// `min` and `max` must both be present and parse as integers; otherwise the
/// option list from `opt` (falling back to `options`) is used. A range wins
/// when both forms are present.
pub fn parse_capability(element: &Element) -> Option<Capability> {
    if let (Some(min), Some(max)) = (element.attribute("min"), element.attribute("max")) {
        if let (Ok(min), Ok(max)) = (min.trim().parse::<i64>(), max.trim().parse::<i64>()) {
            return Some(Capability::Range { min, max });
        }
    }

    let raw = element
        .attribute("opt")
        .filter(|value| !value.is_empty())
        .or_else(|| element.attribute("options"))?;
    let options: Vec<String> = raw
        .split(|c| c == ';' || c == ',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    if options.is_empty() {
        None
    } else {
        Some(Capability::Options(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn capability_of(xml: &str) -> Option<Capability> {
        parse_capability(&parse(xml).expect("parse capability element"))
    }

    #[test]
    fn range_from_min_max() {
        assert_eq!(
            capability_of(r#"<brightnessLevel min="0" max="100">50</brightnessLevel>"#),
            Some(Capability::Range { min: 0, max: 100 })
        );
        assert_eq!(
            capability_of(r#"<gain min=" -10 " max="10"/>"#),
            Some(Capability::Range { min: -10, max: 10 })
        );
    }

    #[test]
    fn options_split_on_both_separators() {
        assert_eq!(
            capability_of(r#"<mode opt="open; close ,auto,,"/>"#),
            Some(Capability::Options(vec![
                "open".into(),
                "close".into(),
                "auto".into()
            ]))
        );
        assert_eq!(
            capability_of(r#"<mode opt="" options="a,b"/>"#),
            Some(Capability::Options(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn range_takes_precedence() {
        assert_eq!(
            capability_of(r#"<level min="1" max="9" opt="low,high"/>"#),
            Some(Capability::Range { min: 1, max: 9 })
        );
    }

    #[test]
    fn unparsable_range_falls_through_to_options() {
        assert_eq!(
            capability_of(r#"<level min="x" max="9" opt="low"/>"#),
            Some(Capability::Options(vec!["low".into()]))
        );
        assert_eq!(capability_of(r#"<level min="x" max="9"/>"#), None);
    }

    #[test]
    fn missing_or_empty_attributes_yield_nothing() {
        assert_eq!(capability_of(r#"<level min="1"/>"#), None);
        assert_eq!(capability_of(r#"<mode opt=" ; , "/>"#), None);
        assert_eq!(capability_of("<mode>auto</mode>"), None);
    }

    #[test]
    fn admits_checks_the_constraint() {
        let range = Capability::Range { min: 0, max: 100 };
        assert!(range.admits("100"));
        assert!(!range.admits("101"));
        assert!(!range.admits("abc"));
        let options = Capability::Options(vec!["open".into(), "close".into()]);
        assert!(options.admits("close"));
        assert!(!options.admits("auto"));
    }
}
