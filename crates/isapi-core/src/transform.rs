//! Request bodies for camera updates and Loxone exports.
//!
//! Edits are rendered against a scratch copy of the document, so the tree
//! never holds a half-applied value, whatever the outcome.

use std::fmt;

use isapi_xml::normalize;
use tracing::debug;

use crate::{ConfigTree, Module, NodeId, TreeError};

/// Fully rendered update for one edited leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EditPlan {
    pub node: NodeId,
    pub module: Module,
    /// Resource the body is written to.
    pub request_path: String,
    /// Namespace-free module XML carrying the edited value.
    pub body: String,
}

/// Outcome of the placeholder search in an export body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Substitution {
    /// The node has no range constraint.
    NotApplicable,
    /// The literal value was replaced with the placeholder.
    Applied,
    /// Range node, but `<tag>value</tag>` does not occur verbatim in the body.
    NotFound,
}

/// Payload for a Loxone "Virtual Output" and its command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoxoneExport {
    /// Camera address with embedded credentials.
    pub target_address: String,
    pub request_path: String,
    pub request_body: String,
    /// The body carries the placeholder and should be driven by a dimmer.
    pub is_range_value: bool,
    pub substitution: Substitution,
    pub placeholder: String,
}

impl LoxoneExport {
    pub const METHOD: &'static str = "PUT";
    pub const HEADER: &'static str = "Content-Type: application/xml";
}

impl fmt::Display for LoxoneExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Virtual Output")?;
        writeln!(f, "  Address:          {}", self.target_address)?;
        writeln!(f, "Virtual Output Command")?;
        writeln!(f, "  Command for ON:   {}", self.request_path)?;
        writeln!(f, "  HTTP header:      {}", Self::HEADER)?;
        writeln!(f, "  HTTP method:      {}", Self::METHOD)?;
        writeln!(f, "  HTTP body:")?;
        writeln!(f, "{}", self.request_body)?;
        match self.substitution {
            Substitution::Applied => writeln!(
                f,
                "Note: body contains '{}'; connect this command to a dimmer.",
                self.placeholder
            ),
            Substitution::NotFound => writeln!(
                f,
                "Note: value could not be located in the body; no placeholder was inserted."
            ),
            Substitution::NotApplicable => Ok(()),
        }
    }
}

/// Replace the first verbatim `<tag>value</tag>` in `body` with the placeholder.
///
/// Returns `None` when the pattern does not occur, for example because the
/// serialiser escaped characters in `value`.
pub fn substitute_placeholder(
    body: &str,
    tag: &str,
    value: &str,
    placeholder: &str,
) -> Option<String> {
    let pattern = format!("<{tag}>{value}</{tag}>");
    if !body.contains(&pattern) {
        return None;
    }
    Some(body.replacen(&pattern, &format!("<{tag}>{placeholder}</{tag}>"), 1))
}

impl ConfigTree {
    /// Render the module body that results from setting `id` to `value`.
    ///
    /// The root and folders are rejected before anything is rendered.
    pub fn render_edit(&self, id: NodeId, value: &str) -> Result<EditPlan, TreeError> {
        let node = self.editable(id)?;
        let module = self.resolve_module(id)?;
        let mut scratch = self.document.clone();
        scratch
            .at_mut(&node.locator)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?
            .set_text(value);
        let module_element = scratch
            .at(&module.locator)
            .ok_or_else(|| TreeError::NodeNotFound(module.name.clone()))?;
        let body = normalize(module_element)?;
        let request_path = self.request_path(&module);
        debug!(node = %id, tag = %node.tag, module = %module.name, path = %request_path, "rendered edit");
        Ok(EditPlan {
            node: id,
            module,
            request_path,
            body,
        })
    }

    /// Render a Loxone command that sets `id` to `value` on the camera at `target_address`.
    pub fn loxone_export(
        &self,
        id: NodeId,
        value: &str,
        target_address: impl Into<String>,
    ) -> Result<LoxoneExport, TreeError> {
        let plan = self.render_edit(id, value)?;
        let node = self
            .node(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        let placeholder = self.config.placeholder.clone();
        let (request_body, substitution) = match &node.capability {
            Some(cap) if cap.is_range() => {
                match substitute_placeholder(&plan.body, &node.tag, value, &placeholder) {
                    Some(body) => (body, Substitution::Applied),
                    None => (plan.body, Substitution::NotFound),
                }
            }
            _ => (plan.body, Substitution::NotApplicable),
        };
        debug!(node = %id, ?substitution, "rendered loxone export");
        Ok(LoxoneExport {
            target_address: target_address.into(),
            request_path: plan.request_path,
            request_body,
            is_range_value: substitution == Substitution::Applied,
            substitution,
            placeholder,
        })
    }
}
