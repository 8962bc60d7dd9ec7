//! Request-routing REST client for clustered OrientDB servers
//!
//! Maintains a fixed pool of server nodes, selects a node per call through a
//! pluggable load-balancing strategy, dispatches HTTP requests and interprets
//! responses into typed results or classified errors, tolerating version skew
//! between server releases.

pub mod balancer;
pub mod client;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod node;
pub mod request;
pub mod response;
pub mod session;
pub mod version;

pub use client::{ConnectMetadata, DatabaseStorage, RestClient};
pub use config::{ClientConfig, LoadBalancingMode, NodeConfig};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeTarget, Vertex};
pub use model::{Document, Rid, SchemaClass, SchemaProperty};
pub use request::{RawResponse, RequestSpec};
pub use response::{BodyCheck, Payload};
pub use session::Credentials;
pub use version::{DEFAULT_SERVER_VERSION, compare_versions};
