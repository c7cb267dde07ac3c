//! Transport behavior on the wire: default headers, authentication, path
//! prefix, argument placement and proxying.

use std::collections::BTreeMap;

use octopace_client::ApiError;
use octopace_core::config::{ProxyConfig, TunnelProxyConfig};
use octopace_core::ports::Operation;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_requests_carry_default_headers_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .and(header(
            "user-agent",
            format!("octopace/{}", env!("CARGO_PKG_VERSION")).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::repo_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&common::config_for(&server).build());
    let repo = common::call_ok(&client, "repos", "get", common::repo_args()).await;

    assert_eq!(repo["full_name"], "octo/hello");
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("x-request-source", "integration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = common::config_for(&server)
        .header("X-Request-Source", "integration")
        .build();
    let client = common::client(&config);
    let user = common::call_ok(&client, "users", "getAuthenticated", Value::Null).await;

    assert_eq!(user["login"], "octocat");
}

#[tokio::test]
async fn test_path_prefix_is_prepended() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/users/octocat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = common::config_for(&server).path_prefix("/api/v3").build();
    let client = common::client(&config);
    common::call_ok(&client, "users", "getByUsername", json!({"username": "octocat"})).await;
}

#[tokio::test]
async fn test_get_arguments_become_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("q", "tokio"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_count": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&common::config_for(&server).build());
    let result =
        common::call_ok(&client, "search", "repos", json!({"q": "tokio", "per_page": 5})).await;

    assert_eq!(result["total_count"], 1);
}

#[tokio::test]
async fn test_post_arguments_become_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/hello/issues"))
        .and(body_json(json!({"title": "Bug", "labels": ["bug"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"number": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&common::config_for(&server).build());
    let issue = common::call_ok(
        &client,
        "issues",
        "create",
        json!({"owner": "octo", "repo": "hello", "title": "Bug", "labels": ["bug"]}),
    )
    .await;

    assert_eq!(issue["number"], 42);
}

#[tokio::test]
async fn test_no_content_yields_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/repos/octo/hello/releases/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&common::config_for(&server).build());
    let result = common::call_ok(
        &client,
        "repos",
        "deleteRelease",
        json!({"owner": "octo", "repo": "hello", "release_id": 7}),
    )
    .await;

    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_http_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Not Found",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&common::config_for(&server).build());
    let err = client
        .operation("repos", "get")
        .unwrap()
        .invoke(&json!({"owner": "octo", "repo": "missing"}))
        .await
        .unwrap_err();

    match err {
        ApiError::Http {
            status,
            message,
            body,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
            assert!(body.is_some());
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_path_argument_fails_before_sending() {
    let server = MockServer::start().await;
    let client = common::client(&common::config_for(&server).build());

    let err = client
        .operation("repos", "get")
        .unwrap()
        .invoke(&json!({"owner": "octo"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidArguments(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_error_surfaces_on_first_call() {
    // Nothing listens on port 9 (discard) on test machines.
    let config = octopace_core::config::ConfigBuilder::new()
        .base_url("http://127.0.0.1:9")
        .retries(0)
        .build();
    let client = common::client(&config);

    let err = client
        .operation("users", "getAuthenticated")
        .unwrap()
        .invoke(&Value::Null)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_forward_proxy_receives_requests_with_via_headers() {
    // The mock server plays the forward proxy for a plain-http API host.
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("via", "1.1 octopace"))
        .and(header("x-forwarded-for", "127.0.0.1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .expect(1)
        .mount(&proxy)
        .await;

    let config = common::config_for(&proxy)
        .base_url("http://api.octopace.test")
        .proxy(ProxyConfig::Forward(proxy.uri()))
        .build();
    let client = common::client(&config);
    let user = common::call_ok(&client, "users", "getAuthenticated", Value::Null).await;

    assert_eq!(user["login"], "octocat");
}

/// Accepts one connection, returns its request head and refuses the tunnel
async fn refusing_tunnel() -> (u16, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
        let _ = stream
            .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\n\r\n")
            .await;
    });

    (port, rx)
}

fn tunnel_to(port: u16) -> ProxyConfig {
    ProxyConfig::Tunnel(TunnelProxyConfig {
        host: "127.0.0.1".to_string(),
        port,
        reject_unauthorized: true,
        headers: BTreeMap::from([(
            "proxy-authorization".to_string(),
            "Basic dXNlcjpwYXNz".to_string(),
        )]),
    })
}

#[tokio::test]
async fn test_tunnel_proxy_sends_connect_with_configured_headers() {
    let (port, head) = refusing_tunnel().await;

    let config = octopace_core::config::ConfigBuilder::new()
        .base_url("https://api.octopace.test")
        .credential(common::TOKEN)
        .retries(0)
        .proxy(tunnel_to(port))
        .build();
    let client = common::client(&config);

    let err = client
        .operation("users", "getAuthenticated")
        .unwrap()
        .invoke(&Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");

    let head = head.await.unwrap();
    let request_line = head.lines().next().unwrap_or_default();
    assert!(
        request_line.starts_with("CONNECT api.octopace.test:443 "),
        "request line was {request_line:?}"
    );
    assert!(
        head.to_ascii_lowercase()
            .contains("proxy-authorization: basic dxnlcjpwyxnz"),
        "CONNECT head was {head:?}"
    );
    // The bearer credential belongs to the origin, not the tunnel.
    assert!(!head.contains(common::TOKEN));
}

#[tokio::test]
async fn test_tunnel_proxy_is_bypassed_for_plain_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .expect(1)
        .mount(&server)
        .await;

    // Port 9 has no listener; a tunnelled request would fail to connect.
    let config = common::config_for(&server).proxy(tunnel_to(9)).build();
    let client = common::client(&config);
    let user = common::call_ok(&client, "users", "getAuthenticated", Value::Null).await;

    assert_eq!(user["login"], "octocat");
}
