use anyhow::{Context, Result};
use isapi::{ConfigNode, EditPlan};
use serde::Serialize;
use tracing::{info, warn};

use crate::common::{self, Connection};

#[derive(Serialize)]
struct SetResponse<'a> {
    node: &'a str,
    value: &'a str,
    url: String,
    sent: bool,
    plan: &'a EditPlan,
}

pub async fn run(
    conn: &Connection,
    selector: String,
    value: String,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut explorer = common::open_explorer(conn).await?;
    let id = {
        let tree = explorer.tree().context("configuration not loaded")?;
        let id = common::resolve_node(tree, &selector)?;
        if let Some(note) = constraint_violation(common::node(tree, id)?, &value) {
            warn!(node = %selector, "{note}");
        }
        id
    };

    let plan = if dry_run {
        explorer
            .preview(id, &value)
            .with_context(|| format!("render update for {selector}"))?
    } else {
        info!(node = %id, "sending update");
        explorer
            .write(id, &value)
            .await
            .with_context(|| format!("write {selector}"))?
    };
    let url = explorer.transport().endpoint().url(&plan.request_path);

    if json {
        let payload = SetResponse {
            node: &selector,
            value: &value,
            url,
            sent: !dry_run,
            plan: &plan,
        };
        return common::print_json(&payload);
    }

    if dry_run {
        println!("PUT {url}");
        println!("{}", plan.body);
    } else {
        println!("{selector} = {value} (module {} via {url})", plan.module.name);
    }
    Ok(())
}

/// Describe how `value` falls outside the node's advertised constraint.
///
/// The camera is the final judge, so a violation is reported but not enforced.
pub fn constraint_violation(node: &ConfigNode, value: &str) -> Option<String> {
    let capability = node.capability.as_ref()?;
    (!capability.admits(value))
        .then(|| format!("'{value}' is outside {capability} advertised for {}", node.tag))
}
