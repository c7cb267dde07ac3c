//! Retry behavior against failing endpoints
//!
//! Every retry goes back through the operation group's pacing gate, so the
//! number of requests the server sees and their spacing are both checked.

use std::time::{Duration, Instant};

use octopace_client::{ApiError, AttemptOutcome};
use octopace_core::ports::Operation;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn error_body(message: &str) -> serde_json::Value {
    json!({"message": message})
}

#[tokio::test]
async fn test_failing_call_is_retried_through_group_gate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body("Server Error")))
        .expect(4)
        .mount(&server)
        .await;

    let config = common::config_for(&server)
        .group_interval_ms("core", 100)
        .retries(3)
        .retry_factor(1.0)
        .retry_min_timeout_ms(1)
        .build();
    let client = common::client(&config);

    let start = Instant::now();
    let err = client
        .operation("repos", "get")
        .unwrap()
        .invoke(&common::repo_args())
        .await
        .unwrap_err();

    // Four attempts, at least 100ms apart.
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(matches!(err, ApiError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_last_error_is_returned_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body("first")))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .respond_with(ResponseTemplate::new(503).set_body_json(error_body("last")))
        .expect(1)
        .mount(&server)
        .await;

    let config = common::config_for(&server)
        .retries(2)
        .retry_factor(1.0)
        .retry_min_timeout_ms(1)
        .build();
    let client = common::client(&config);

    let err = client
        .operation("repos", "get")
        .unwrap()
        .invoke(&common::repo_args())
        .await
        .unwrap_err();

    match err {
        ApiError::Http { status, message, .. } => {
            assert_eq!(status, 503);
            assert_eq!(message, "last");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_failures_recover() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    common::mount_repo(&server).await;

    let config = common::config_for(&server)
        .retries(3)
        .retry_factor(2.0)
        .retry_min_timeout_ms(20)
        .build();
    let client = common::client(&config);

    let (result, attempts) = client
        .call_traced("repos", "get", &common::repo_args())
        .await
        .expect("operation exists");

    assert_eq!(result.unwrap()["name"], "hello");
    let outcomes: Vec<_> = attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Failed { retrying: true },
            AttemptOutcome::Failed { retrying: true },
            AttemptOutcome::Succeeded,
        ]
    );
    assert_eq!(attempts[1].backoff, Duration::from_millis(20));
    assert_eq!(attempts[2].backoff, Duration::from_millis(40));
}

#[tokio::test]
async fn test_do_not_retry_statuses_fail_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello"))
        .respond_with(ResponseTemplate::new(404).set_body_json(error_body("Not Found")))
        .expect(1)
        .mount(&server)
        .await;

    let config = common::config_for(&server)
        .retries(5)
        .retry_min_timeout_ms(1)
        .do_not_retry([404])
        .build();
    let client = common::client(&config);

    let (result, attempts) = client
        .call_traced("repos", "get", &common::repo_args())
        .await
        .expect("operation exists");

    assert!(matches!(result, Err(ApiError::Http { status: 404, .. })));
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].outcome, AttemptOutcome::Failed { retrying: false });
}

#[tokio::test]
async fn test_client_errors_are_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/hello/issues"))
        .respond_with(ResponseTemplate::new(422).set_body_json(error_body("Validation Failed")))
        .expect(3)
        .mount(&server)
        .await;

    let config = common::config_for(&server)
        .retries(2)
        .retry_min_timeout_ms(1)
        .build();
    let client = common::client(&config);

    let err = client
        .operation("issues", "create")
        .unwrap()
        .invoke(&json!({"owner": "octo", "repo": "hello", "title": "x"}))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 422, .. }));
}

#[tokio::test]
async fn test_unknown_operation_is_not_traced() {
    let server = MockServer::start().await;
    let client = common::client(&common::config_for(&server).build());

    assert!(client
        .call_traced("repos", "doesNotExist", &json!({}))
        .await
        .is_none());
}
