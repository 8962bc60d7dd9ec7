//! Server nodes and the fixed-size node pool

use crate::config::NodeConfig;
use crate::{Error, Result};
use parking_lot::Mutex;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// One server endpoint and its transport handle
///
/// The handle is built lazily on first use and released by [`Node::cleanup`],
/// which is safe to call any number of times.
#[derive(Debug)]
pub struct Node {
    host: String,
    port: u16,
    ssl: bool,
    /// Transport handle template injected by the client, if any
    template: Option<Client>,
    transport: Mutex<Option<Client>>,
}

impl Node {
    /// Create a node from its configuration
    ///
    /// When `template` is given it is used as the transport handle instead of
    /// building a fresh one.
    pub fn new(config: &NodeConfig, template: Option<Client>) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            ssl: config.ssl,
            template,
            transport: Mutex::new(None),
        }
    }

    /// Server hostname
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server REST port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this node is addressed over HTTPS
    pub fn ssl(&self) -> bool {
        self.ssl
    }

    /// Base URL for this node
    pub fn base_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Absolute URL for a server-relative path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Get the transport handle, building it on first use
    pub fn transport(&self) -> Result<Client> {
        let mut guard = self.transport.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let client = match &self.template {
            Some(template) => template.clone(),
            None => Client::builder()
                .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
                .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
                .build()?,
        };
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Release the transport handle
    ///
    /// Idempotent: both the failed-connect and the disconnect path invoke this
    /// unconditionally across all nodes.
    pub fn cleanup(&self) {
        let released = self.transport.lock().take().is_some();
        if released {
            debug!(host = %self.host, port = self.port, "released node transport");
        }
    }
}

/// Ordered, fixed-size sequence of nodes
///
/// The pool size matches the load balancer's configured capacity and never
/// changes after construction.
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<Node>,
}

impl NodePool {
    /// Build a pool from node configurations
    pub fn new(configs: &[NodeConfig], template: Option<Client>) -> Result<Self> {
        if configs.is_empty() {
            return Err(Error::invalid_options("nodes must not be empty"));
        }
        let nodes = configs
            .iter()
            .map(|c| Node::new(c, template.clone()))
            .collect();
        Ok(Self { nodes })
    }

    /// Number of nodes in the pool
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the pool is empty; construction guarantees it never is
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `index`
    ///
    /// Indices come from a [`crate::balancer::LoadBalancer`] configured with
    /// this pool's size, so they are always in range.
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// The fixed node used by one-off administrative calls
    pub fn first(&self) -> &Node {
        &self.nodes[0]
    }

    /// Release every node's transport handle
    pub fn cleanup_all(&self) {
        for node in &self.nodes {
            node.cleanup();
        }
    }
}
