#![cfg_attr(docsrs, feature(doc_cfg))]
//! High level ISAPI image-settings explorer that re-exports the workspace
//! crates and sequences loading, writing and exporting.
//!
//! ```rust,no_run
//! use isapi::http::{Credentials, Endpoint, IsapiClient, Routing};
//! use isapi::{Explorer, ExplorerConfig, ExplorerError};
//!
//! # async fn run() -> Result<(), ExplorerError> {
//! let endpoint = Endpoint::new("192.168.10.150", Routing::Direct)?;
//! let client = IsapiClient::new(endpoint, Credentials::new("admin", "12345"))?;
//! let mut explorer = Explorer::new(client, ExplorerConfig::default());
//! let tree = explorer.load().await?;
//! let id = tree.find_by_path("Color/brightnessLevel").map(|node| node.id);
//! if let Some(id) = id {
//!     let plan = explorer.write(id, "60").await?;
//!     println!("wrote {}", plan.request_path);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use isapi_http::{HttpError, IsapiClient};
use isapi_xml::{Element, XmlError};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use isapi_core as tree;
pub use isapi_http as http;
pub use isapi_xml as xml;

pub use isapi_core::{
    Capability, CapabilityIndex, ConfigNode, ConfigTree, EditKind, EditPlan, ExplorerConfig,
    LoxoneExport, Module, NodeId, Substitution, TreeError,
};

/// Error type produced by the high level explorer.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// The camera could not be reached or the address is unusable.
    #[error(transparent)]
    Transport(HttpError),
    /// The camera answered with a non-success status.
    #[error("camera rejected the request with status {status}: {body}")]
    Protocol { status: u16, body: String },
    /// The configuration document is not well-formed XML.
    #[error("invalid XML response from camera: {0}")]
    Malformed(#[from] XmlError),
    /// The selected node cannot be edited or does not exist.
    #[error(transparent)]
    Selection(#[from] TreeError),
    /// No configuration has been loaded yet.
    #[error("no configuration loaded")]
    NotLoaded,
}

impl From<HttpError> for ExplorerError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Status { status, body } => ExplorerError::Protocol { status, body },
            other => ExplorerError::Transport(other),
        }
    }
}

/// Moves XML documents to and from a camera.
#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Read the document at `path`.
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<String, HttpError>;
    /// Replace the document at `path` with `body`, returning the reply text.
    async fn store(&self, path: &str, body: String) -> Result<String, HttpError>;
    /// Address with embedded credentials for controllers that call the camera themselves.
    fn controller_address(&self) -> String;
}

#[async_trait]
impl DocumentTransport for IsapiClient {
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<String, HttpError> {
        self.get_xml(path, timeout).await
    }

    async fn store(&self, path: &str, body: String) -> Result<String, HttpError> {
        self.put_xml(path, body).await
    }

    fn controller_address(&self) -> String {
        IsapiClient::controller_address(self)
    }
}

/// Explorer facade combining the configuration tree with a transport.
#[derive(Debug)]
pub struct Explorer<T: DocumentTransport> {
    transport: T,
    config: ExplorerConfig,
    tree: Option<ConfigTree>,
}

impl<T: DocumentTransport> Explorer<T> {
    pub fn new(transport: T, config: ExplorerConfig) -> Self {
        Self {
            transport,
            config,
            tree: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// The tree from the last successful load, if any.
    pub fn tree(&self) -> Option<&ConfigTree> {
        self.tree.as_ref()
    }

    fn loaded(&self) -> Result<&ConfigTree, ExplorerError> {
        self.tree.as_ref().ok_or(ExplorerError::NotLoaded)
    }

    /// Fetch the configuration and, when available, its capabilities, then
    /// replace the tree.
    ///
    /// A failed load leaves the previous tree in place. Capability failures
    /// of any kind only cost the constraints.
    pub async fn load(&mut self) -> Result<&ConfigTree, ExplorerError> {
        let base = self.config.base_path.clone();
        info!(path = %base, "loading configuration");
        let text = self
            .transport
            .fetch(&base, isapi_http::consts::CONFIG_TIMEOUT)
            .await?;
        let document = Element::parse(&text)?;

        let capabilities = self.fetch_capabilities().await;
        let index = CapabilityIndex::from_document(capabilities.as_ref());
        let tree = ConfigTree::build(document, &index, self.config.clone());
        info!(
            root = %tree.root().tag,
            nodes = tree.len(),
            constrained = index.len(),
            "configuration loaded"
        );
        Ok(self.tree.insert(tree))
    }

    async fn fetch_capabilities(&self) -> Option<Element> {
        let path = self.config.capabilities_path();
        let text = match self
            .transport
            .fetch(&path, isapi_http::consts::CAPABILITIES_TIMEOUT)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(%path, error = %err, "could not load capabilities");
                return None;
            }
        };
        match Element::parse(&text) {
            Ok(document) => Some(document),
            Err(err) => {
                warn!(%path, error = %err, "ignoring malformed capabilities");
                None
            }
        }
    }

    /// Render the update for `id` without sending it.
    pub fn preview(&self, id: NodeId, value: &str) -> Result<EditPlan, ExplorerError> {
        Ok(self.loaded()?.render_edit(id, value)?)
    }

    /// Send the module containing `id` with `value` applied.
    ///
    /// The tree only takes the new value once the camera accepted it.
    pub async fn write(&mut self, id: NodeId, value: &str) -> Result<EditPlan, ExplorerError> {
        let plan = self.preview(id, value)?;
        info!(node = %id, path = %plan.request_path, "writing module");
        let reply = self
            .transport
            .store(&plan.request_path, plan.body.clone())
            .await?;
        debug!(bytes = reply.len(), "camera accepted update");
        self.tree
            .as_mut()
            .ok_or(ExplorerError::NotLoaded)?
            .commit_edit(id, value)?;
        Ok(plan)
    }

    /// Render a Loxone command for `id`, addressed through the transport.
    pub fn loxone_export(&self, id: NodeId, value: &str) -> Result<LoxoneExport, ExplorerError> {
        let tree = self.loaded()?;
        Ok(tree.loxone_export(id, value, self.transport.controller_address())?)
    }
}
