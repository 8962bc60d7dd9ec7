//! REST client: node pool, session lifecycle and request dispatch

use crate::balancer::{LoadBalancer, balancer_for};
use crate::config::ClientConfig;
use crate::model::{Document, Rid, SchemaClass};
use crate::node::NodePool;
use crate::request::{RawResponse, RequestSpec};
use crate::response::{self, BodyCheck, Payload};
use crate::session::{ActiveSession, Credentials, Session};
use crate::version::{self, compare_versions};
use crate::{Error, Result};
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::future::Future;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info};
use url::form_urlencoded;

/// First server release whose dedicated class endpoint returns complete data
const CLASS_ENDPOINT_MIN_VERSION: &str = "1.1.0";

#[allow(clippy::unwrap_used)]
fn record_not_found_checks() -> &'static [BodyCheck] {
    static CHECKS: OnceLock<Vec<BodyCheck>> = OnceLock::new();
    CHECKS.get_or_init(|| {
        vec![BodyCheck::not_found(
            Regex::new("ORecordNotFoundException").unwrap(),
            "record not found",
        )]
    })
}

#[allow(clippy::unwrap_used)]
fn get_document_checks() -> &'static [BodyCheck] {
    static CHECKS: OnceLock<Vec<BodyCheck>> = OnceLock::new();
    CHECKS.get_or_init(|| {
        vec![
            BodyCheck::not_found(
                Regex::new("ORecordNotFoundException").unwrap(),
                "record not found",
            ),
            // the server words it differently when the record was deleted
            BodyCheck::not_found(
                Regex::new("Record with id .* was not found").unwrap(),
                "record not found",
            ),
        ]
    })
}

#[allow(clippy::unwrap_used)]
fn validation_checks() -> &'static [BodyCheck] {
    static CHECKS: OnceLock<Vec<BodyCheck>> = OnceLock::new();
    CHECKS.get_or_init(|| {
        vec![BodyCheck::data(
            Regex::new("OValidationException").unwrap(),
            "validation problem",
        )]
    })
}

#[allow(clippy::unwrap_used)]
fn update_document_checks() -> &'static [BodyCheck] {
    static CHECKS: OnceLock<Vec<BodyCheck>> = OnceLock::new();
    CHECKS.get_or_init(|| {
        vec![
            BodyCheck::data(
                Regex::new("OConcurrentModificationException").unwrap(),
                "concurrent modification",
            ),
            BodyCheck::data(
                Regex::new("OValidationException").unwrap(),
                "validation problem",
            ),
        ]
    })
}

#[allow(clippy::unwrap_used)]
fn invalid_class_checks() -> &'static [BodyCheck] {
    static CHECKS: OnceLock<Vec<BodyCheck>> = OnceLock::new();
    CHECKS.get_or_init(|| {
        vec![BodyCheck::not_found(
            Regex::new("Invalid class").unwrap(),
            "class not found",
        )]
    })
}

/// Storage backend for a newly created database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseStorage {
    /// In-memory, non-persistent
    #[default]
    Memory,
    /// Disk-backed local storage
    Local,
    /// Paginated local storage
    PLocal,
}

impl DatabaseStorage {
    /// The path segment this storage type uses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local => "local",
            Self::PLocal => "plocal",
        }
    }
}

impl std::fmt::Display for DatabaseStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata returned by a successful connect
#[derive(Debug, Clone)]
pub struct ConnectMetadata {
    raw: Value,
    classes: Vec<SchemaClass>,
}

impl ConnectMetadata {
    fn from_value(raw: Value) -> Result<Self> {
        let classes = match raw.get("classes") {
            Some(Value::Array(items)) => items
                .iter()
                .map(SchemaClass::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };
        Ok(Self { raw, classes })
    }

    /// Schema classes of the opened database
    pub fn classes(&self) -> &[SchemaClass] {
        &self.classes
    }

    /// Look up a schema class by name
    pub fn class(&self, name: &str) -> Option<&SchemaClass> {
        self.classes.iter().find(|c| c.name() == name)
    }

    /// The full decoded connect payload
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Request-routing REST client for a clustered server
///
/// Holds a fixed pool of nodes, a node-selection strategy and a single
/// session. Session-bound operations fail fast while disconnected; one-off
/// administrative calls (create/delete database) bypass the balancer and
/// always target the first node.
///
/// # Example
///
/// ```no_run
/// use orientdb_rest::{ClientConfig, RestClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RestClient::new(ClientConfig::new().with_host("db1.example.com"))?;
/// client.connect("demo", "admin", "admin").await?;
/// let docs = client.query("SELECT FROM OUser", None).await?;
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RestClient {
    pool: NodePool,
    balancer: Box<dyn LoadBalancer>,
    session: RwLock<Session>,
}

impl RestClient {
    /// Create a client from its configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create a client using a caller-supplied transport handle
    ///
    /// Every node shares the given `reqwest::Client` instead of building its
    /// own.
    pub fn with_http_client(config: ClientConfig, client: reqwest::Client) -> Result<Self> {
        Self::build(config, Some(client))
    }

    fn build(config: ClientConfig, template: Option<reqwest::Client>) -> Result<Self> {
        config.validate()?;
        let nodes = config.effective_nodes();
        let pool = NodePool::new(&nodes, template)?;
        let balancer = balancer_for(config.load_balancing, pool.len());
        info!(
            "client initialized with {} node(s), load_balancing={}",
            pool.len(),
            config.load_balancing
        );
        Ok(Self {
            pool,
            balancer,
            session: RwLock::new(Session::new()),
        })
    }

    /// Number of nodes in the pool
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Whether a session is currently open
    pub fn is_connected(&self) -> bool {
        self.session.read().is_connected()
    }

    /// Database of the active session, if connected
    pub fn database(&self) -> Option<String> {
        self.session.read().snapshot().map(|s| s.database)
    }

    /// Negotiated server version of the active session, if connected
    pub fn server_version(&self) -> Option<String> {
        self.session.read().snapshot().map(|s| s.server_version)
    }

    // --------------------------------------------------------------- dispatch

    /// Send one request against a balancer-selected node
    async fn dispatch(&self, spec: RequestSpec) -> Result<RawResponse> {
        let index = self.balancer.select();
        self.dispatch_to(index, spec).await
    }

    /// Send one administrative request against the fixed first node
    async fn dispatch_one_off(&self, spec: RequestSpec) -> Result<RawResponse> {
        self.dispatch_to(0, spec).await
    }

    async fn dispatch_to(&self, index: usize, spec: RequestSpec) -> Result<RawResponse> {
        let node = self.pool.node(index);
        let url = node.url_for(&spec.path);
        debug!("{} {} (node {})", spec.method, url, index);

        let (user, password) = self.request_credentials(&spec);
        let transport = node.transport()?;
        let mut request = transport.request(spec.method.clone(), &url);
        if let Some(user) = user {
            request = request.basic_auth(user, password);
        }
        if let Some(content_type) = &spec.content_type {
            request = request.header("Content-Type", content_type);
        }
        if let Some(body) = spec.body {
            request = request.body(body);
        }

        let response = request.send().await?;
        RawResponse::capture(response).await
    }

    /// Per-call override wins; otherwise the session credentials apply
    fn request_credentials(&self, spec: &RequestSpec) -> (Option<String>, Option<String>) {
        if spec.user_override.is_some() {
            return (spec.user_override.clone(), spec.password_override.clone());
        }
        match self.session.read().snapshot() {
            Some(active) => (Some(active.user), Some(active.password)),
            None => (None, None),
        }
    }

    /// Guard for session-bound operations
    fn ensure_connected(&self) -> Result<ActiveSession> {
        self.session.read().snapshot().ok_or(Error::NotConnected)
    }

    /// Reset the session and release every node's transport handle
    fn rollback(&self) {
        self.session.write().close();
        self.pool.cleanup_all();
    }

    /// Log elapsed wall-clock time around an operation without altering its
    /// outcome
    async fn timed<T, F>(operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let outcome = fut.await;
        debug!("{} finished in {:?}", operation, started.elapsed());
        outcome
    }

    // ------------------------------------------------------------- connection

    /// Open a session against the given database
    ///
    /// All three arguments are mandatory. Any failure rolls the client back to
    /// a fully disconnected state: no session field survives and every node's
    /// transport handle is released.
    pub async fn connect(&self, database: &str, user: &str, password: &str) -> Result<ConnectMetadata> {
        let credentials = Credentials::new(database, user, password);
        credentials.validate()?;
        if self.is_connected() {
            return Err(Error::connection_failed("session already connected"));
        }

        let spec = RequestSpec::get(format!("connect/{}", credentials.database))
            .with_auth_override(&credentials.user, &credentials.password);
        let outcome: Result<Value> = async {
            let response = self.dispatch(spec).await?;
            response::process(&response, &[])?.into_json()
        }
        .await;

        let raw: Value = match outcome {
            Ok(value) => value,
            Err(e) => {
                self.rollback();
                return Err(Error::connection_failed(e.to_string()));
            }
        };

        let reported = raw.pointer("/server/version").and_then(Value::as_str);
        let server_version = version::accept_reported(reported);
        let metadata = match ConnectMetadata::from_value(raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                self.rollback();
                return Err(Error::connection_failed(e.to_string()));
            }
        };

        self.session.write().open(credentials, server_version.clone());
        debug!("successfully connected to server, version={server_version}");
        Ok(metadata)
    }

    /// Close the session
    ///
    /// The server-side disconnect call rejects the session's authentication in
    /// some deployments, so its failure is ignored; local state is reset and
    /// node resources are released no matter what.
    pub async fn disconnect(&self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }

        match self.dispatch(RequestSpec::get("disconnect")).await {
            Ok(response) => debug!("disconnect returned status {}", response.status),
            Err(e) => debug!("disconnect request failed: {e}"),
        }

        self.session.write().close();
        self.pool.cleanup_all();
        debug!("disconnected from server");
        Ok(())
    }

    // ----------------------------------------------------------------- server

    /// Server information, optionally with per-call credentials
    pub async fn server(&self, auth: Option<(&str, &str)>) -> Result<Value> {
        let mut spec = RequestSpec::get("server");
        if let Some((user, password)) = auth {
            spec = spec.with_auth_override(user, password);
        }
        let response = self.dispatch(spec).await?;
        payload_to_value(response::process(&response, &[])?)
    }

    // --------------------------------------------------------------- database

    /// Create a database; a one-off call pinned to the first node
    pub async fn create_database(
        &self,
        name: &str,
        storage: DatabaseStorage,
        auth: Option<(&str, &str)>,
    ) -> Result<Value> {
        ensure_not_blank("database", name)?;
        let mut spec = RequestSpec::post(format!("database/{name}/{storage}"));
        if let Some((user, password)) = auth {
            spec = spec.with_auth_override(user, password);
        }
        let response = self.dispatch_one_off(spec).await?;
        payload_to_value(response::process(&response, &[])?)
    }

    /// Database information
    ///
    /// With no explicit name the active session's database is used, which
    /// requires a connected session.
    pub async fn get_database(
        &self,
        name: Option<&str>,
        auth: Option<(&str, &str)>,
    ) -> Result<Value> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.ensure_connected()?.database,
        };
        ensure_not_blank("database", &name)?;

        let mut spec = RequestSpec::get(format!("database/{name}"));
        if let Some((user, password)) = auth {
            spec = spec.with_auth_override(user, password);
        }
        let response = self.dispatch(spec).await?;
        // a missing database is indistinguishable from bad auth here: the
        // server answers 401 for both
        payload_to_value(response::process(&response, &[])?)
    }

    /// Delete a database; a one-off call pinned to the first node
    pub async fn delete_database(&self, name: &str, auth: Option<(&str, &str)>) -> Result<Value> {
        ensure_not_blank("database", name)?;
        let mut spec = RequestSpec::delete(format!("database/{name}"));
        if let Some((user, password)) = auth {
            spec = spec.with_auth_override(user, password);
        }
        let response = self.dispatch_one_off(spec).await?;
        payload_to_value(response::process(&response, &[])?)
    }

    // -------------------------------------------------------------------- sql

    /// Run a read query, returning the entries of the `result` array
    pub async fn query(&self, sql: &str, limit: Option<u32>) -> Result<Vec<Document>> {
        let session = self.ensure_connected()?;
        ensure_not_blank("query", sql)?;

        Self::timed("query", async {
            let mut path = format!("query/{}/sql/{}", session.database, encode_sql(sql));
            if let Some(limit) = limit {
                path.push_str(&format!("/{limit}"));
            }
            let response = self.dispatch(RequestSpec::get(path)).await?;
            let value = response::process(&response, record_not_found_checks())?.into_json()?;
            let entries = value
                .get("result")
                .and_then(Value::as_array)
                .cloned()
                .ok_or_else(|| Error::protocol("query response has no result array"))?;
            entries.into_iter().map(Document::from_value).collect()
        })
        .await
    }

    /// Run a write command
    pub async fn command(&self, sql: &str) -> Result<Value> {
        let session = self.ensure_connected()?;
        ensure_not_blank("command", sql)?;

        Self::timed("command", async {
            let path = format!("command/{}/sql/{}", session.database, encode_sql(sql));
            let response = self.dispatch(RequestSpec::post(path)).await?;
            payload_to_value(response::process(&response, &[])?)
        })
        .await
    }

    // ------------------------------------------------------------------ class

    /// Fetch a schema class by name
    ///
    /// Servers older than 1.1.0 return incomplete data from the dedicated
    /// class endpoint, so the connect metadata is re-read and filtered locally
    /// instead. That branch raises NotFound unless exactly one class matches.
    pub async fn get_class(&self, name: &str) -> Result<SchemaClass> {
        let session = self.ensure_connected()?;
        ensure_not_blank("class name", name)?;

        if compare_versions(&session.server_version, CLASS_ENDPOINT_MIN_VERSION)
            != Ordering::Less
        {
            let path = format!("class/{}/{}", session.database, name);
            let response = self.dispatch(RequestSpec::get(path)).await?;
            let value = response::process(&response, invalid_class_checks())?.into_json()?;
            SchemaClass::from_value(&value)
        } else {
            let path = format!("connect/{}", session.database);
            let response = self.dispatch(RequestSpec::get(path)).await?;
            let value = response::process(&response, invalid_class_checks())?.into_json()?;
            let empty = Vec::new();
            let matches: Vec<&Value> = value
                .get("classes")
                .and_then(Value::as_array)
                .unwrap_or(&empty)
                .iter()
                .filter(|class| class.get("name").and_then(Value::as_str) == Some(name))
                .collect();
            if matches.len() != 1 {
                return Err(Error::not_found(format!("class not found, name={name}")));
            }
            SchemaClass::from_value(matches[0])
        }
    }

    /// Whether a schema class exists
    pub async fn class_exists(&self, name: &str) -> Result<bool> {
        match self.get_class(name).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a schema class
    pub async fn create_class(&self, name: &str) -> Result<Value> {
        let session = self.ensure_connected()?;
        ensure_not_blank("class name", name)?;
        let path = format!("class/{}/{}", session.database, name);
        let response = self.dispatch(RequestSpec::post(path)).await?;
        payload_to_value(response::process(&response, &[])?)
    }

    /// Drop a schema class
    pub async fn drop_class(&self, name: &str) -> Result<()> {
        self.ensure_connected()?;
        ensure_not_blank("class name", name)?;
        self.command(&format!("DROP CLASS {name}")).await?;
        Ok(())
    }

    /// Create a property on a schema class
    pub async fn create_property(
        &self,
        class: &str,
        property: &str,
        property_type: &str,
    ) -> Result<()> {
        self.ensure_connected()?;
        ensure_not_blank("class name", class)?;
        ensure_not_blank("property name", property)?;
        ensure_not_blank("property type", property_type)?;
        self.command(&format!("CREATE PROPERTY {class}.{property} {property_type}"))
            .await?;
        Ok(())
    }

    // --------------------------------------------------------------- document

    /// Store a new document, returning its record identifier
    pub async fn create_document(&self, doc: &Document) -> Result<Rid> {
        let session = self.ensure_connected()?;
        let body = serde_json::to_string(&doc.as_value())?;
        let spec = RequestSpec::post(format!("document/{}", session.database))
            .with_body("application/json", body);
        let response = self.dispatch(spec).await?;
        match response::process(&response, validation_checks())? {
            Payload::Text(rid) => Rid::parse(&rid),
            Payload::Json(value) => value
                .get("@rid")
                .and_then(Value::as_str)
                .map(Rid::parse)
                .transpose()?
                .ok_or_else(|| Error::protocol("create response carries no @rid")),
        }
    }

    /// Fetch a document by record identifier
    pub async fn get_document(&self, rid: Rid) -> Result<Document> {
        let session = self.ensure_connected()?;
        let path = format!("document/{}/{}", session.database, rid.unprefixed());
        let response = self.dispatch(RequestSpec::get(path)).await?;
        let value = response::process(&response, get_document_checks())?.into_json()?;
        Document::from_value(value)
    }

    /// Update a document in place
    ///
    /// The document must carry a RID and a version; the RID is stripped from
    /// the transmitted body since it cannot be updated.
    pub async fn update_document(&self, doc: &Document) -> Result<()> {
        let session = self.ensure_connected()?;
        let rid = doc
            .rid()
            .ok_or_else(|| Error::invalid_argument("document has no RID"))?;
        if doc.version().is_none() {
            return Err(Error::invalid_argument("document has no version"));
        }

        let mut body = doc.clone();
        body.remove("@rid");
        let spec = RequestSpec::put(format!(
            "document/{}/{}",
            session.database,
            rid.unprefixed()
        ))
        .with_body("application/json", serde_json::to_string(&body.as_value())?);
        let response = self.dispatch(spec).await?;
        response::process(&response, update_document_checks())?;
        Ok(())
    }

    /// Delete a document by record identifier
    pub async fn delete_document(&self, rid: Rid) -> Result<()> {
        let session = self.ensure_connected()?;
        let path = format!("document/{}/{}", session.database, rid.unprefixed());
        let response = self.dispatch(RequestSpec::delete(path)).await?;
        response::process(&response, record_not_found_checks())?;
        Ok(())
    }
}

/// Percent-encode SQL for embedding in a path segment
fn encode_sql(sql: &str) -> String {
    form_urlencoded::byte_serialize(sql.as_bytes()).collect()
}

fn ensure_not_blank(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{what} is blank")));
    }
    Ok(())
}

/// Flatten a payload into a JSON value; plain text becomes a JSON string
fn payload_to_value(payload: Payload) -> Result<Value> {
    Ok(match payload {
        Payload::Json(value) => value,
        Payload::Text(text) => Value::String(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadBalancingMode, NodeConfig};

    fn client() -> RestClient {
        RestClient::new(ClientConfig::new()).unwrap()
    }

    #[test]
    fn test_initially_disconnected() {
        let client = client();
        assert!(!client.is_connected());
        assert!(client.database().is_none());
        assert!(client.server_version().is_none());
    }

    #[tokio::test]
    async fn test_guard_rejects_disconnected_operations() {
        let client = client();
        assert!(matches!(
            client.query("SELECT FROM OUser", None).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            client.command("DELETE FROM OUser").await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            client.get_class("OUser").await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            client.get_document(Rid::new(9, 0)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_blank_credentials() {
        let client = client();
        assert!(matches!(
            client.connect("", "admin", "admin").await,
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            client.connect("demo", "admin", " ").await,
            Err(Error::InvalidArgument { .. })
        ));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_guard_runs_before_argument_validation() {
        let client = client();
        // blank input, but the connection guard short-circuits first
        assert!(matches!(
            client.query("  ", None).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(client.command("").await, Err(Error::NotConnected)));
        assert!(matches!(
            client.update_document(&Document::empty()).await,
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_pool_size_matches_config() {
        let config = ClientConfig::new()
            .with_nodes(vec![
                NodeConfig::new("a", 2480, false),
                NodeConfig::new("b", 2480, false),
                NodeConfig::new("c", 2480, false),
            ])
            .with_load_balancing(LoadBalancingMode::RoundRobin);
        let client = RestClient::new(config).unwrap();
        assert_eq!(client.pool_size(), 3);
    }

    #[test]
    fn test_encode_sql() {
        assert_eq!(
            encode_sql("SELECT FROM OUser WHERE name = 'reader'"),
            "SELECT+FROM+OUser+WHERE+name+%3D+%27reader%27"
        );
    }

    #[test]
    fn test_storage_segments() {
        assert_eq!(DatabaseStorage::Memory.as_str(), "memory");
        assert_eq!(DatabaseStorage::Local.as_str(), "local");
        assert_eq!(DatabaseStorage::PLocal.as_str(), "plocal");
        assert_eq!(DatabaseStorage::default(), DatabaseStorage::Memory);
    }

    #[test]
    fn test_payload_to_value() {
        assert_eq!(
            payload_to_value(Payload::Text("ok".into())).unwrap(),
            Value::String("ok".into())
        );
        assert_eq!(
            payload_to_value(Payload::Json(serde_json::json!({"a": 1}))).unwrap(),
            serde_json::json!({"a": 1})
        );
    }

    #[test]
    fn test_connect_metadata_classes() {
        let metadata = ConnectMetadata::from_value(serde_json::json!({
            "classes": [
                {"name": "OUser", "properties": [{"name": "name", "type": "STRING"}]},
                {"name": "ORole"}
            ],
            "server": {"version": "1.4.0"}
        }))
        .unwrap();
        assert_eq!(metadata.classes().len(), 2);
        assert_eq!(metadata.class("OUser").unwrap().properties().len(), 1);
        assert!(metadata.class("Missing").is_none());
        assert_eq!(metadata.raw()["server"]["version"], "1.4.0");
    }
}
