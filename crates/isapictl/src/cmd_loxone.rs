use anyhow::{Context, Result};
use tracing::warn;

use isapi::Substitution;

use crate::common::{self, Connection};

pub async fn run(conn: &Connection, selector: String, value: String, json: bool) -> Result<()> {
    let explorer = common::open_explorer(conn).await?;
    let id = {
        let tree = explorer.tree().context("configuration not loaded")?;
        common::resolve_node(tree, &selector)?
    };
    let export = explorer
        .loxone_export(id, &value)
        .with_context(|| format!("export {selector}"))?;
    if export.substitution == Substitution::NotFound {
        warn!(node = %selector, "value not found verbatim in body; placeholder not inserted");
    }

    if json {
        return common::print_json(&export);
    }
    print!("{export}");
    Ok(())
}
