use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use isapi::tree::consts::{BASE_PATH, MODULE_SEGMENT_INDEX};
use tracing_subscriber::EnvFilter;

use isapictl::cmd_loxone;
use isapictl::cmd_set;
use isapictl::cmd_show;
use isapictl::cmd_tree;
use isapictl::common::Connection;

#[derive(Parser, Debug)]
#[command(name = "isapictl", version, about = "ISAPI image-settings explorer")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long)]
    json: bool,
    /// Camera address, with or without scheme
    #[arg(long, default_value = "192.168.10.150")]
    host: String,
    #[arg(long, default_value = "admin")]
    user: String,
    #[arg(long, env = "ISAPI_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,
    /// Route requests through `<proxy>/camera-proxy/<host>`
    #[arg(long)]
    proxy: Option<String>,
    /// Image settings resource
    #[arg(long, default_value = BASE_PATH)]
    base_path: String,
    /// Path segment naming the module of a node
    #[arg(long, default_value_t = MODULE_SEGMENT_INDEX)]
    module_segment_index: usize,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the configuration tree with capabilities
    Tree,
    /// Describe one node (`#id` or tag path such as `Color/brightnessLevel`)
    Show {
        #[arg(long)]
        node: String,
    },
    /// Write a value; the containing module is sent as a whole
    Set {
        #[arg(long)]
        node: String,
        #[arg(long)]
        value: String,
        /// Print the request instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Render a Loxone virtual output command for a value
    Loxone {
        #[arg(long)]
        node: String,
        #[arg(long)]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        host,
        user,
        password,
        proxy,
        base_path,
        module_segment_index,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let conn = Connection {
        host,
        user,
        password,
        proxy,
        base_path,
        module_segment_index,
    };

    match cmd {
        Cmd::Tree => cmd_tree::run(&conn, json).await?,
        Cmd::Show { node } => cmd_show::run(&conn, node, json).await?,
        Cmd::Set {
            node,
            value,
            dry_run,
        } => cmd_set::run(&conn, node, value, dry_run, json).await?,
        Cmd::Loxone { node, value } => cmd_loxone::run(&conn, node, value, json).await?,
    };

    Ok(())
}
