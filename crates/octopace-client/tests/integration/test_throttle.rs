//! Request pacing against a live mock server
//!
//! Uses real time, so assertions are lower bounds for spacing and generous
//! upper bounds for independence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use octopace_client::{ThrottleRegistry, ThrottledClient};
use octopace_core::domain::GroupId;
use octopace_core::ports::Operation;
use octopace_telemetry::MetricsRegistry;
use serde_json::json;
use wiremock::MockServer;

use crate::common;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test]
async fn test_same_group_calls_are_spaced() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;

    let config = common::config_for(&server)
        .group_interval_ms("core", 150)
        .build();
    let client = common::client(&config);

    let start = Instant::now();
    for _ in 0..3 {
        common::call_ok(&client, "repos", "get", common::repo_args()).await;
    }

    assert!(start.elapsed() >= ms(300));
}

#[tokio::test]
async fn test_concurrent_calls_are_spaced() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;

    let config = common::config_for(&server)
        .group_interval_ms("core", 100)
        .build();
    let client = common::client(&config);
    let op = client.operation("repos", "get").unwrap();

    let start = Instant::now();
    let args = common::repo_args();
    let results = join_all((0..4).map(|_| op.invoke(&args))).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(start.elapsed() >= ms(300));
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_groups_do_not_delay_each_other() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;
    common::mount_search(&server).await;

    let config = common::config_for(&server)
        .group_interval_ms("search", 5_000)
        .group_interval_ms("core", 5_000)
        .build();
    let client = common::client(&config);

    let start = Instant::now();
    common::call_ok(&client, "search", "repos", json!({"q": "tokio"})).await;
    common::call_ok(&client, "repos", "get", common::repo_args()).await;

    // Each group's first call is granted immediately.
    assert!(start.elapsed() < ms(2_000));
}

#[tokio::test]
async fn test_global_gate_spaces_calls_across_groups() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;
    common::mount_search(&server).await;

    let config = common::config_for(&server)
        .global_interval_ms(150)
        .build();
    let client = common::client(&config);

    let start = Instant::now();
    common::call_ok(&client, "search", "repos", json!({"q": "tokio"})).await;
    common::call_ok(&client, "repos", "get", common::repo_args()).await;
    common::call_ok(&client, "search", "repos", json!({"q": "serde"})).await;

    assert!(start.elapsed() >= ms(300));
}

#[tokio::test]
async fn test_operation_override_moves_call_to_other_group() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;

    let config = common::config_for(&server)
        .group_interval_ms("slow", 200)
        .operation_group("repos.get", "slow")
        .build();
    let client = common::client(&config);
    assert_eq!(client.group_of("repos", "get"), GroupId::new("slow").unwrap());

    let start = Instant::now();
    common::call_ok(&client, "repos", "get", common::repo_args()).await;
    common::call_ok(&client, "repos", "get", common::repo_args()).await;

    assert!(start.elapsed() >= ms(200));
}

#[tokio::test]
async fn test_shared_registry_paces_both_clients() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;

    let registry = Arc::new(ThrottleRegistry::new([], ms(200), None));
    let config = common::config_for(&server).build();
    let first = ThrottledClient::builder(&config)
        .shared_registry(Arc::clone(&registry))
        .build()
        .unwrap();
    let second = ThrottledClient::builder(&config)
        .shared_registry(Arc::clone(&registry))
        .build()
        .unwrap();

    let start = Instant::now();
    common::call_ok(&first, "repos", "get", common::repo_args()).await;
    common::call_ok(&second, "repos", "get", common::repo_args()).await;

    assert!(start.elapsed() >= ms(200));
}

#[tokio::test]
async fn test_metrics_count_attempts_per_group() {
    let server = MockServer::start().await;
    common::mount_repo(&server).await;
    common::mount_search(&server).await;

    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let config = common::config_for(&server).build();
    let client = ThrottledClient::builder(&config)
        .metrics(Arc::clone(&metrics))
        .build()
        .unwrap();

    common::call_ok(&client, "repos", "get", common::repo_args()).await;
    common::call_ok(&client, "repos", "get", common::repo_args()).await;
    common::call_ok(&client, "search", "repos", json!({"q": "x"})).await;

    assert_eq!(metrics.attempts("core"), 2);
    assert_eq!(metrics.attempts("search"), 1);
    assert_eq!(metrics.retries("core"), 0);
    assert!(metrics.encode().unwrap().contains("repos.get"));
}
