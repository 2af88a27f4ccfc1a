//! ISAPI configuration tree: capability merge, module resolution and edit
//! transforms over an immutable document.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod capability;
mod transform;

use std::fmt;

use isapi_xml::{Element, XmlError};
use thiserror::Error;
use tracing::debug;

pub use capability::CapabilityIndex;
pub use isapi_xml::Capability;
pub use transform::{substitute_placeholder, EditPlan, LoxoneExport, Substitution};

/// ISAPI image-settings constants.
pub mod consts {
    /// Resource holding the image settings of the first video channel.
    pub const BASE_PATH: &str = "/ISAPI/Image/channels/1";
    /// Segment appended to [`BASE_PATH`] for the constraints document.
    pub const CAPABILITIES_SEGMENT: &str = "capabilities";
    /// Index of the `full_path` segment naming the module.
    ///
    /// Tied to the depth of [`BASE_PATH`]: `/ISAPI/Image/channels/1/<Root>`
    /// splits into six segments, the last of which is at index 5.
    pub const MODULE_SEGMENT_INDEX: usize = 5;
    /// Token a Loxone dimmer replaces with its live value.
    pub const LOXONE_PLACEHOLDER: &str = "\\v";
}

/// Error type produced by tree lookups and edit transforms.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The root element is a container and cannot be submitted on its own.
    #[error("the root element <{0}> cannot be edited; select a parameter inside it")]
    RootSelected(String),
    /// The node has child elements; only leaves carry editable values.
    #[error("<{0}> is a folder; select a parameter inside it")]
    FolderSelected(String),
    /// No node with this id exists in the current tree.
    #[error("node not found: {0}")]
    NodeNotFound(String),
    /// Serialising the module failed.
    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Paths and tokens shared by tree building and request generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Resource the configuration document is read from and written to.
    pub base_path: String,
    /// Segment appended to `base_path` for the capabilities document.
    pub capabilities_segment: String,
    /// `full_path` segment index naming the module, see [`consts::MODULE_SEGMENT_INDEX`].
    pub module_segment_index: usize,
    /// Token substituted for range values in Loxone exports.
    pub placeholder: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_path: consts::BASE_PATH.to_string(),
            capabilities_segment: consts::CAPABILITIES_SEGMENT.to_string(),
            module_segment_index: consts::MODULE_SEGMENT_INDEX,
            placeholder: consts::LOXONE_PLACEHOLDER.to_string(),
        }
    }
}

impl ExplorerConfig {
    pub fn capabilities_path(&self) -> String {
        format!(
            "{}/{}",
            self.base_path.trim_end_matches('/'),
            self.capabilities_segment
        )
    }
}

/// Identifier of a node, unique within one [`ConfigTree`] build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input style suited to a leaf, derived from its capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EditKind {
    Text,
    Range,
    List,
}

/// One element of the configuration document.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConfigNode {
    pub id: NodeId,
    /// Element local name.
    pub tag: String,
    /// Trimmed text for leaves, empty for folders.
    pub text: String,
    pub children: Vec<ConfigNode>,
    /// Base path plus the root tag; descendants inherit it unchanged.
    pub full_path: String,
    pub capability: Option<Capability>,
    pub parent_tag: Option<String>,
    /// Child-index path of the backing element inside the document.
    pub locator: Vec<usize>,
}

impl ConfigNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn edit_kind(&self) -> EditKind {
        match &self.capability {
            Some(Capability::Options(_)) => EditKind::List,
            Some(Capability::Range { .. }) => EditKind::Range,
            None => EditKind::Text,
        }
    }

    /// Depth-first pre-order iterator over this node and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

/// Unit of modification accepted by the write endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Module {
    /// Tag of the module element.
    pub name: String,
    /// Child-index path of the module element; empty for the root.
    pub locator: Vec<usize>,
}

/// Configuration document together with the node tree built over it.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    config: ExplorerConfig,
    document: Element,
    root: ConfigNode,
    len: usize,
}

struct BuildContext<'a> {
    index: &'a CapabilityIndex,
    base_path: &'a str,
    next_id: usize,
}

impl ConfigTree {
    /// Build the node tree for `document`, annotating nodes from `index`.
    pub fn build(document: Element, index: &CapabilityIndex, config: ExplorerConfig) -> Self {
        let mut ctx = BuildContext {
            index,
            base_path: &config.base_path,
            next_id: 0,
        };
        let root = build_node(&document, ctx.base_path, None, Vec::new(), &mut ctx);
        let len = ctx.next_id;
        debug!(root = %root.tag, nodes = len, "built configuration tree");
        Self {
            config,
            document,
            root,
            len,
        }
    }

    /// Parse the configuration (and optional capabilities) text and build the tree.
    pub fn from_xml(
        config_xml: &str,
        capabilities_xml: Option<&str>,
        config: ExplorerConfig,
    ) -> Result<Self, XmlError> {
        let document = Element::parse(config_xml)?;
        let capabilities = capabilities_xml.map(Element::parse).transpose()?;
        let index = CapabilityIndex::from_document(capabilities.as_ref());
        Ok(Self::build(document, &index, config))
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// The configuration document the tree was built from.
    pub fn document(&self) -> &Element {
        &self.document
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigNode> {
        self.root.iter()
    }

    pub fn node(&self, id: NodeId) -> Option<&ConfigNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Find a node by slash-separated tags below the root, e.g. `Color/brightnessLevel`.
    ///
    /// An empty path, or the root tag itself, selects the root.
    pub fn find_by_path(&self, path: &str) -> Option<&ConfigNode> {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&self.root.tag.as_str()) {
            segments.next();
        }
        segments.try_fold(&self.root, |node, segment| {
            node.children.iter().find(|child| child.tag == segment)
        })
    }

    /// Determine the module a node belongs to.
    pub fn resolve_module(&self, id: NodeId) -> Result<Module, TreeError> {
        let node = self.require(id)?;
        if node.id == self.root.id {
            return Ok(Module {
                name: self.root.tag.clone(),
                locator: Vec::new(),
            });
        }
        let segment = node
            .full_path
            .split('/')
            .nth(self.config.module_segment_index)
            .filter(|segment| !segment.is_empty())
            .unwrap_or(node.tag.as_str());
        let module = self
            .root
            .children
            .iter()
            .find(|child| child.tag == segment)
            .unwrap_or(&self.root);
        Ok(Module {
            name: module.tag.clone(),
            locator: module.locator.clone(),
        })
    }

    /// Resource path a module is written to.
    pub fn request_path(&self, module: &Module) -> String {
        if module.name == self.root.tag {
            self.config.base_path.clone()
        } else {
            format!("{}/{}", self.config.base_path, module.name)
        }
    }

    /// Record a value the camera accepted: updates the node text and the
    /// stored document so later edits of the same module carry it.
    pub fn commit_edit(&mut self, id: NodeId, value: &str) -> Result<(), TreeError> {
        let locator = self.editable(id)?.locator.clone();
        let element = self
            .document
            .at_mut(&locator)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        element.set_text(value);
        let node = find_node_mut(&mut self.root, id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))?;
        node.text = value.trim().to_string();
        debug!(node = %id, value, "committed edit");
        Ok(())
    }

    fn require(&self, id: NodeId) -> Result<&ConfigNode, TreeError> {
        self.node(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    /// Node that may be edited: neither the root nor a folder.
    fn editable(&self, id: NodeId) -> Result<&ConfigNode, TreeError> {
        let node = self.require(id)?;
        if node.id == self.root.id {
            return Err(TreeError::RootSelected(node.tag.clone()));
        }
        if !node.is_leaf() {
            return Err(TreeError::FolderSelected(node.tag.clone()));
        }
        Ok(node)
    }
}

fn build_node(
    element: &Element,
    path: &str,
    parent_tag: Option<&str>,
    locator: Vec<usize>,
    ctx: &mut BuildContext<'_>,
) -> ConfigNode {
    let tag = element.local_name().to_string();
    let full_path = if path == ctx.base_path {
        format!("{path}/{tag}")
    } else {
        path.to_string()
    };
    let id = NodeId(ctx.next_id);
    ctx.next_id += 1;
    let text = if element.is_leaf() {
        element.text_content().trim().to_string()
    } else {
        String::new()
    };
    let capability = ctx.index.by_tag(&tag).cloned();
    let children = element
        .children
        .iter()
        .enumerate()
        .map(|(position, child)| {
            let mut child_locator = locator.clone();
            child_locator.push(position);
            build_node(child, &full_path, Some(tag.as_str()), child_locator, ctx)
        })
        .collect();
    ConfigNode {
        id,
        tag,
        text,
        children,
        full_path,
        capability,
        parent_tag: parent_tag.map(str::to_string),
        locator,
    }
}

fn find_node_mut(node: &mut ConfigNode, id: NodeId) -> Option<&mut ConfigNode> {
    if node.id == id {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|child| find_node_mut(child, id))
}
