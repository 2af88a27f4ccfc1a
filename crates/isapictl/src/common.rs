use anyhow::{anyhow, Context, Result};
use isapi::http::{Credentials, Endpoint, IsapiClient, Routing};
use isapi::{ConfigNode, ConfigTree, Explorer, ExplorerConfig, NodeId};
use serde::Serialize;
use tracing::info;

/// Camera address, credentials and resource layout shared by all commands.
#[derive(Debug, Clone)]
pub struct Connection {
    pub host: String,
    pub user: String,
    pub password: String,
    pub proxy: Option<String>,
    pub base_path: String,
    pub module_segment_index: usize,
}

impl Connection {
    pub fn explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            base_path: self.base_path.clone(),
            module_segment_index: self.module_segment_index,
            ..ExplorerConfig::default()
        }
    }

    pub fn client(&self) -> Result<IsapiClient> {
        let routing = match &self.proxy {
            Some(base) => Routing::Proxy { base: base.clone() },
            None => Routing::Direct,
        };
        let endpoint = Endpoint::new(&self.host, routing).context("build camera endpoint")?;
        IsapiClient::new(
            endpoint,
            Credentials::new(self.user.clone(), self.password.clone()),
        )
        .context("create http client")
    }
}

/// Connect to the camera and load its configuration tree.
pub async fn open_explorer(conn: &Connection) -> Result<Explorer<IsapiClient>> {
    let client = conn.client()?;
    let mut explorer = Explorer::new(client, conn.explorer_config());
    let tree = explorer
        .load()
        .await
        .with_context(|| format!("load configuration from {}", conn.host))?;
    info!(nodes = tree.len(), "configuration ready");
    Ok(explorer)
}

/// Resolve a node selector: `#3` or `3` for an id, otherwise a tag path
/// such as `Color/brightnessLevel`.
pub fn resolve_node(tree: &ConfigTree, selector: &str) -> Result<NodeId> {
    let selector = selector.trim();
    let by_id = selector
        .strip_prefix('#')
        .unwrap_or(selector)
        .parse::<usize>()
        .ok()
        .map(NodeId);
    let node = match by_id {
        Some(id) => tree.node(id),
        None => tree.find_by_path(selector),
    };
    node.map(|node| node.id)
        .ok_or_else(|| anyhow!("no node matches '{selector}'"))
}

pub fn node<'a>(tree: &'a ConfigTree, id: NodeId) -> Result<&'a ConfigNode> {
    tree.node(id).ok_or_else(|| anyhow!("node {id} not found"))
}

/// Slash-separated tag path of a node below the root, as accepted by [`resolve_node`].
pub fn tag_path(tree: &ConfigTree, id: NodeId) -> Option<String> {
    fn walk(node: &ConfigNode, id: NodeId, trail: &mut Vec<String>) -> bool {
        if node.id == id {
            return true;
        }
        for child in &node.children {
            trail.push(child.tag.clone());
            if walk(child, id, trail) {
                return true;
            }
            trail.pop();
        }
        false
    }
    let mut trail = Vec::new();
    walk(tree.root(), id, &mut trail).then(|| trail.join("/"))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}
