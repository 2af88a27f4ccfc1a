use anyhow::Result;
use isapi::ConfigNode;
use tracing::info;

use crate::common::{self, Connection};

pub async fn run(conn: &Connection, json: bool) -> Result<()> {
    let explorer = common::open_explorer(conn).await?;
    let Some(tree) = explorer.tree() else {
        return Ok(());
    };
    info!(root = %tree.root().tag, nodes = tree.len(), "printing tree");

    if json {
        return common::print_json(tree.root());
    }

    println!("{}", tree.root().full_path);
    let mut out = String::new();
    render(tree.root(), 0, &mut out);
    print!("{out}");
    Ok(())
}

/// Indented listing, one node per line.
pub fn render(node: &ConfigNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let line = if node.is_leaf() {
        let constraint = node
            .capability
            .as_ref()
            .map(|cap| format!("  [{cap}]"))
            .unwrap_or_default();
        format!(
            "{indent}{:<5} {} = {}{constraint}\n",
            node.id.to_string(),
            node.tag,
            node.text
        )
    } else {
        format!("{indent}{:<5} {}/\n", node.id.to_string(), node.tag)
    };
    out.push_str(&line);
    for child in &node.children {
        render(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isapi::{ConfigTree, ExplorerConfig};

    #[test]
    fn renders_folders_leaves_and_constraints() {
        let tree = ConfigTree::from_xml(
            "<ImageChannel><Color><hue>3</hue></Color><mode>auto</mode></ImageChannel>",
            Some(r#"<ImageChannel><hue min="0" max="10"/><mode opt="auto,manual"/></ImageChannel>"#),
            ExplorerConfig::default(),
        )
        .expect("tree");
        let mut out = String::new();
        render(tree.root(), 0, &mut out);
        let expected = "\
#0    ImageChannel/
  #1    Color/
    #2    hue = 3  [range 0..=10]
  #3    mode = auto  [one of auto, manual]
";
        assert_eq!(out, expected);
    }
}
