use anyhow::{Context, Result};
use isapi::{Capability, ConfigTree, EditKind, NodeId};
use serde::Serialize;

use crate::common::{self, Connection};

#[derive(Debug, Serialize)]
pub struct NodeDetails {
    pub id: NodeId,
    pub tag: String,
    pub path: String,
    pub full_path: String,
    pub parent: Option<String>,
    pub value: Option<String>,
    pub capability: Option<Capability>,
    pub edit_kind: Option<EditKind>,
    pub module: String,
    pub request_path: String,
}

impl NodeDetails {
    pub fn collect(tree: &ConfigTree, id: NodeId) -> Result<Self> {
        let node = common::node(tree, id)?;
        let module = tree
            .resolve_module(id)
            .with_context(|| format!("resolve module of {id}"))?;
        let leaf = node.is_leaf() && node.id != tree.root().id;
        Ok(Self {
            id,
            tag: node.tag.clone(),
            path: common::tag_path(tree, id).unwrap_or_default(),
            full_path: node.full_path.clone(),
            parent: node.parent_tag.clone(),
            value: leaf.then(|| node.text.clone()),
            capability: node.capability.clone(),
            edit_kind: leaf.then(|| node.edit_kind()),
            request_path: tree.request_path(&module),
            module: module.name,
        })
    }
}

pub async fn run(conn: &Connection, selector: String, json: bool) -> Result<()> {
    let explorer = common::open_explorer(conn).await?;
    let Some(tree) = explorer.tree() else {
        return Ok(());
    };
    let id = common::resolve_node(tree, &selector)?;
    let details = NodeDetails::collect(tree, id)?;

    if json {
        return common::print_json(&details);
    }

    println!("{:<14} {}", "Node", details.id);
    println!("{:<14} {}", "Tag", details.tag);
    println!("{:<14} {}", "Path", details.path);
    println!("{:<14} {}", "Full path", details.full_path);
    println!(
        "{:<14} {}",
        "Parent",
        details.parent.as_deref().unwrap_or("-")
    );
    match (&details.value, details.edit_kind) {
        (Some(value), Some(kind)) => {
            println!("{:<14} {value}", "Value");
            println!("{:<14} {kind:?}", "Editor");
        }
        _ => println!("{:<14} folder (not editable)", "Value"),
    }
    if let Some(cap) = &details.capability {
        println!("{:<14} {cap}", "Constraint");
    }
    println!("{:<14} {}", "Module", details.module);
    println!("{:<14} PUT {}", "Request", details.request_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use isapi::ExplorerConfig;

    fn tree() -> ConfigTree {
        ConfigTree::from_xml(
            r#"<ImageChannel><Color><brightnessLevel>50</brightnessLevel></Color></ImageChannel>"#,
            Some(r#"<ImageChannel><brightnessLevel min="0" max="100"/></ImageChannel>"#),
            ExplorerConfig::default(),
        )
        .expect("tree")
    }

    #[test]
    fn leaf_details_include_editor_and_request() {
        let tree = tree();
        let details = NodeDetails::collect(&tree, NodeId(2)).expect("details");
        assert_eq!(details.path, "Color/brightnessLevel");
        assert_eq!(details.full_path, "/ISAPI/Image/channels/1/ImageChannel");
        assert_eq!(details.parent.as_deref(), Some("Color"));
        assert_eq!(details.value.as_deref(), Some("50"));
        assert_eq!(details.edit_kind, Some(EditKind::Range));
        assert_eq!(details.module, "ImageChannel");
        assert_eq!(details.request_path, "/ISAPI/Image/channels/1");
    }

    #[test]
    fn folders_and_root_have_no_value() {
        let tree = tree();
        for id in [NodeId(0), NodeId(1)] {
            let details = NodeDetails::collect(&tree, id).expect("details");
            assert!(details.value.is_none());
            assert!(details.edit_kind.is_none());
        }
    }
}
