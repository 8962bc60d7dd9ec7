//! Integration tests for the connect/disconnect session lifecycle

use orientdb_rest::{ClientConfig, Error, RestClient};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RestClient {
    let config = ClientConfig::new()
        .with_host("127.0.0.1")
        .with_port(server.address().port());
    RestClient::new(config).unwrap()
}

fn connect_body(version: &str) -> serde_json::Value {
    json!({
        "classes": [
            {"name": "OUser", "properties": [{"name": "name", "type": "STRING"}]},
            {"name": "ORole"}
        ],
        "server": {"version": version}
    })
}

/// Connect stores credentials and the negotiated server version
#[tokio::test]
async fn test_connect_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .and(header("Authorization", "Basic YWRtaW46YWRtaW4="))
        .respond_with(ResponseTemplate::new(200).set_body_json(connect_body("1.4.0")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let metadata = client.connect("demo", "admin", "admin").await.unwrap();

    assert!(client.is_connected());
    assert_eq!(client.database().as_deref(), Some("demo"));
    assert_eq!(client.server_version().as_deref(), Some("1.4.0"));
    assert_eq!(metadata.classes().len(), 2);
    assert_eq!(metadata.class("OUser").unwrap().properties().len(), 1);
}

/// A server without a version block degrades to the baseline version
#[tokio::test]
async fn test_connect_without_server_block_assumes_baseline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"classes": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.connect("demo", "admin", "admin").await.unwrap();
    assert_eq!(client.server_version().as_deref(), Some("1.0.0"));
}

/// A malformed reported version degrades to the baseline version
#[tokio::test]
async fn test_connect_with_malformed_version_assumes_baseline() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "classes": [],
            "server": {"version": "SNAPSHOT"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.connect("demo", "admin", "admin").await.unwrap();
    assert_eq!(client.server_version().as_deref(), Some("1.0.0"));
}

/// A protocol failure during connect leaves no partial session state behind
#[tokio::test]
async fn test_failed_connect_rolls_back() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.connect("demo", "admin", "wrong").await;

    assert!(matches!(result, Err(Error::ConnectionFailed { .. })));
    assert!(!client.is_connected());
    assert!(client.database().is_none());
    assert!(client.server_version().is_none());
}

/// A transport failure during connect rolls back the same way
#[tokio::test]
async fn test_connect_transport_failure_rolls_back() {
    let server = MockServer::start().await;
    let port = server.address().port();
    // release the port so the connection is refused
    drop(server);

    let config = ClientConfig::new().with_host("127.0.0.1").with_port(port);
    let client = RestClient::new(config).unwrap();
    let result = client.connect("demo", "admin", "admin").await;

    assert!(matches!(result, Err(Error::ConnectionFailed { .. })));
    assert!(!client.is_connected());
    assert!(client.database().is_none());
}

/// Connecting an already connected session is refused
#[tokio::test]
async fn test_connect_twice_is_refused() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(connect_body("1.4.0")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.connect("demo", "admin", "admin").await.unwrap();
    let result = client.connect("demo", "admin", "admin").await;
    assert!(matches!(result, Err(Error::ConnectionFailed { .. })));
    // the original session survives
    assert!(client.is_connected());
}

/// Disconnect swallows the server's rejection of the disconnect call
#[tokio::test]
async fn test_disconnect_ignores_rejected_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(connect_body("1.4.0")))
        .mount(&server)
        .await;

    // some deployments answer 401 here no matter what
    Mock::given(method("GET"))
        .and(path("/disconnect"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.connect("demo", "admin", "admin").await.unwrap();
    client.disconnect().await.unwrap();

    assert!(!client.is_connected());
    assert!(client.database().is_none());
}

/// Disconnect resets local state even when the transport itself fails
#[tokio::test]
async fn test_disconnect_survives_transport_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(connect_body("1.4.0")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.connect("demo", "admin", "admin").await.unwrap();

    // kill the server before disconnecting
    drop(server);
    client.disconnect().await.unwrap();

    assert!(!client.is_connected());
    assert!(client.server_version().is_none());
}

/// Disconnecting while already disconnected is a no-op
#[tokio::test]
async fn test_disconnect_when_disconnected_is_noop() {
    let server = MockServer::start().await;

    // no /disconnect mock mounted: the call must never happen
    let client = client_for(&server);
    client.disconnect().await.unwrap();
    assert!(!client.is_connected());
}

/// A fresh connect works after a failed one
#[tokio::test]
async fn test_reconnect_after_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connect/nope"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/connect/demo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(connect_body("1.4.0")))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.connect("nope", "admin", "admin").await.is_err());
    client.connect("demo", "admin", "admin").await.unwrap();
    assert!(client.is_connected());
}
