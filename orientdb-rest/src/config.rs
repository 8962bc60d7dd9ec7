//! Construction-time configuration for the REST client

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;

/// Default server host
pub const DEFAULT_HOST: &str = "localhost";

/// Default REST port
pub const DEFAULT_PORT: u16 = 2480;

/// Load-balancing strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingMode {
    /// Always use the first node; deterministic single-target behavior
    #[default]
    Sequence,
    /// Cycle through all nodes, one selection per call
    RoundRobin,
}

impl LoadBalancingMode {
    /// Convert mode to its configuration string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::RoundRobin => "round_robin",
        }
    }

    /// Parse mode from a configuration string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequence" => Some(Self::Sequence),
            "round_robin" => Some(Self::RoundRobin),
            _ => None,
        }
    }
}

impl fmt::Display for LoadBalancingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoadBalancingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
            .ok_or_else(|| Error::invalid_options(format!("unknown load balancing type: {s}")))
    }
}

/// Connection parameters for one server node
///
/// Unknown keys are rejected during deserialization, matching the top-level
/// option validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NodeConfig {
    /// Server hostname
    pub host: String,
    /// Server REST port
    pub port: u16,
    /// Use HTTPS for this node
    pub ssl: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ssl: false,
        }
    }
}

impl NodeConfig {
    /// Create a node configuration
    pub fn new(host: impl Into<String>, port: u16, ssl: bool) -> Self {
        Self {
            host: host.into(),
            port,
            ssl,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::invalid_options("node host must not be blank"));
        }
        Ok(())
    }
}

/// Client configuration
///
/// Recognized options are `host`, `port`, `ssl`, `nodes` and `load_balancing`;
/// anything else fails deserialization. When `nodes` is absent a single node
/// is synthesized from the top-level host/port/ssl.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    /// Server hostname used when no explicit node list is given
    pub host: String,
    /// Server REST port used when no explicit node list is given
    pub port: u16,
    /// Use HTTPS when no explicit node list is given
    pub ssl: bool,
    /// Per-node overrides of host/port/ssl
    pub nodes: Option<Vec<NodeConfig>>,
    /// Node-selection strategy for session-bound calls
    pub load_balancing: LoadBalancingMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ssl: false,
            nodes: None,
            load_balancing: LoadBalancingMode::Sequence,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a JSON document, rejecting unknown keys
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_options(format!("bad configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the server host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable HTTPS
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Set an explicit node list, replacing the top-level host/port/ssl
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeConfig>) -> Self {
        self.nodes = Some(nodes.into_iter().collect());
        self
    }

    /// Set the load-balancing strategy
    pub fn with_load_balancing(mut self, mode: LoadBalancingMode) -> Self {
        self.load_balancing = mode;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::invalid_options("host must not be blank"));
        }
        if let Some(nodes) = &self.nodes {
            if nodes.is_empty() {
                return Err(Error::invalid_options("nodes must not be empty"));
            }
            for node in nodes {
                node.validate()?;
            }
        }
        Ok(())
    }

    /// Resolve the effective node list, synthesizing a single node from the
    /// top-level options when none was given
    pub fn effective_nodes(&self) -> Vec<NodeConfig> {
        self.nodes.clone().unwrap_or_else(|| {
            vec![NodeConfig::new(self.host.clone(), self.port, self.ssl)]
        })
    }
}
