//! Shared test helpers for REST API integration tests
//!
//! Provides wiremock mock server setup and a configuration builder pointed
//! at the mock server. Retries are off and intervals are zero unless a test
//! sets them.

#![allow(dead_code)]

use octopace_client::ThrottledClient;
use octopace_core::config::{Config, ConfigBuilder};
use octopace_core::ports::Operation;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// Configuration targeting `server` with no pacing and no retries
pub fn config_for(server: &MockServer) -> ConfigBuilder {
    ConfigBuilder::new()
        .base_url(server.uri())
        .credential(TOKEN)
        .group_interval_ms("core", 0)
        .group_interval_ms("search", 0)
        .retries(0)
        .retry_min_timeout_ms(1)
}

pub fn client(config: &Config) -> ThrottledClient {
    ThrottledClient::from_config(config).expect("build throttled client")
}

pub fn repo_json() -> Value {
    json!({
        "id": 1296269,
        "name": "hello",
        "full_name": "octo/hello",
        "private": false
    })
}

/// Mounts `GET /repos/octo/hello`
pub async fn mount_repo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repo_json()))
        .mount(server)
        .await;
}

/// Mounts `GET /search/repositories`
pub async fn mount_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 0,
            "items": []
        })))
        .mount(server)
        .await;
}

pub fn repo_args() -> Value {
    json!({"owner": "octo", "repo": "hello"})
}

/// Calls `namespace.name` on the throttled tree, panicking on failure
pub async fn call_ok(client: &ThrottledClient, namespace: &str, name: &str, args: Value) -> Value {
    client
        .operation(namespace, name)
        .unwrap_or_else(|| panic!("no operation {namespace}.{name}"))
        .invoke(&args)
        .await
        .unwrap_or_else(|e| panic!("{namespace}.{name} failed: {e}"))
}
