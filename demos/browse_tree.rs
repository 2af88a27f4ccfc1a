use std::env;
use std::error::Error;
use std::fs;

use isapi::{ConfigTree, ExplorerConfig};

const SAMPLE_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ImageChannel version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
    <id>1</id>
    <enabled>true</enabled>
    <Color>
        <brightnessLevel>50</brightnessLevel>
        <contrastLevel>50</contrastLevel>
        <saturationLevel>50</saturationLevel>
    </Color>
    <WDR>
        <mode>close</mode>
        <WDRLevel>50</WDRLevel>
    </WDR>
</ImageChannel>"#;

const SAMPLE_CAPABILITIES: &str = r#"<ImageChannel version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
    <Color>
        <brightnessLevel min="0" max="100">50</brightnessLevel>
        <contrastLevel min="0" max="100">50</contrastLevel>
        <saturationLevel min="0" max="100">50</saturationLevel>
    </Color>
    <WDR>
        <mode opt="close,open,auto">close</mode>
        <WDRLevel min="0" max="100">50</WDRLevel>
    </WDR>
</ImageChannel>"#;

/// Usage: `browse_tree [config.xml [capabilities.xml]]`; without arguments a
/// bundled sample is shown.
fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE_CONFIG.to_string(),
    };
    let capabilities = match args.next() {
        Some(path) => Some(fs::read_to_string(path)?),
        None if config == SAMPLE_CONFIG => Some(SAMPLE_CAPABILITIES.to_string()),
        None => None,
    };

    let tree = ConfigTree::from_xml(&config, capabilities.as_deref(), ExplorerConfig::default())?;
    println!("{} nodes under {}", tree.len(), tree.root().full_path);
    for node in tree.iter() {
        let kind = if node.is_leaf() {
            format!("{:?}", node.edit_kind())
        } else {
            "Folder".to_string()
        };
        let constraint = node
            .capability
            .as_ref()
            .map(|cap| cap.to_string())
            .unwrap_or_else(|| "-".into());
        let module = tree.resolve_module(node.id)?;
        println!(
            "{:<5} {:<18} {:<8} {:<8} {:<22} module={}",
            node.id.to_string(),
            node.tag,
            kind,
            node.text,
            constraint,
            module.name
        );
    }
    Ok(())
}
