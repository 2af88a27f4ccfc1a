use std::env;
use std::error::Error;

use isapi::http::{Credentials, Endpoint, IsapiClient, Routing};
use isapi::{Explorer, ExplorerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Usage: `update_camera <host> <node-path> <value>`; credentials come from
/// `ISAPI_USER` (default `admin`) and `ISAPI_PASSWORD`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let mut args = env::args().skip(1);
    let (Some(host), Some(path), Some(value)) = (args.next(), args.next(), args.next()) else {
        eprintln!("usage: update_camera <host> <node-path> <value>");
        return Ok(());
    };
    let credentials = Credentials::new(
        env::var("ISAPI_USER").unwrap_or_else(|_| "admin".into()),
        env::var("ISAPI_PASSWORD").unwrap_or_default(),
    );

    let client = IsapiClient::new(Endpoint::new(&host, Routing::Direct)?, credentials)?;
    let mut explorer = Explorer::new(client, ExplorerConfig::default());
    info!(%host, %path, "loading image settings");
    let id = {
        let tree = explorer.load().await?;
        match tree.find_by_path(&path) {
            Some(node) => {
                if let Some(cap) = node.capability.as_ref().filter(|cap| !cap.admits(&value)) {
                    warn!(%path, %value, "value outside {cap}");
                }
                println!("{path}: {} -> {value}", node.text);
                node.id
            }
            None => {
                eprintln!("{path} not found under {}", tree.root().tag);
                return Ok(());
            }
        }
    };

    let plan = explorer.write(id, &value).await?;
    info!(bytes = plan.body.len(), "camera accepted update");
    println!("PUT {} accepted", plan.request_path);
    println!("{}", plan.body);
    Ok(())
}
