//! Throttled, retrying call wrapper
//!
//! A [`CallWrapper`] stands in for one operation. Every invocation runs a
//! single loop:
//!
//! 1. wait for the operation group's pacing slot (and the global slot),
//! 2. invoke the wrapped operation,
//! 3. on failure ask the [`RetryPolicy`]; when retrying, sleep the backoff
//!    and go back to 1 through the *same* group.
//!
//! Each retry therefore consumes a fresh pacing slot, so retries can never
//! exceed the group's rate. When the policy gives up, the error of the last
//! attempt is returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use octopace_core::domain::GroupId;
use octopace_core::ports::{ErrorBounds, ErrorStatus, Operation, SharedOperation};
use octopace_telemetry::MetricsRegistry;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::rate_limit::ThrottleRegistry;
use crate::retry::{AttemptOutcome, RetryAttempt, RetryPolicy};

/// Lifecycle of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Pending,
    Throttled,
    Invoking,
    Succeeded,
    Failed,
    Exhausted,
}

/// An operation wrapped with group pacing and retries
pub struct CallWrapper<E: ErrorBounds> {
    namespace: String,
    name: String,
    group: GroupId,
    inner: SharedOperation<E>,
    registry: Arc<ThrottleRegistry>,
    policy: Arc<RetryPolicy>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<E: ErrorBounds> std::fmt::Debug for CallWrapper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallWrapper")
            .field("operation", &format_args!("{}.{}", self.namespace, self.name))
            .field("group", &self.group)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<E: ErrorBounds + ErrorStatus> CallWrapper<E> {
    /// Wraps `inner` so every call is paced by `group` and retried per `policy`
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        group: GroupId,
        inner: SharedOperation<E>,
        registry: Arc<ThrottleRegistry>,
        policy: Arc<RetryPolicy>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            group,
            inner,
            registry,
            policy,
            metrics: None,
        }
    }

    /// Records attempts, retries and throttle waits in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Namespace the wrapped operation lives under
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Operation name within its namespace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rate-limit group this operation is paced by
    pub fn group(&self) -> &GroupId {
        &self.group
    }

    /// The wrapped operation
    pub fn inner(&self) -> &SharedOperation<E> {
        &self.inner
    }

    fn enter(&self, state: CallState, attempt: u32) {
        trace!(
            namespace = %self.namespace,
            name = %self.name,
            attempt,
            state = ?state,
            "Call state"
        );
    }

    /// Invokes the operation and also returns the record of every attempt
    pub async fn invoke_traced(&self, args: &Value) -> (Result<Value, E>, Vec<RetryAttempt>) {
        let operation = format!("{}.{}", self.namespace, self.name);
        let group = self.group.as_str();
        let mut attempts = Vec::new();
        let mut backoff = Duration::ZERO;
        let mut number = 0u32;

        self.enter(CallState::Pending, 0);
        loop {
            number = number.saturating_add(1);

            self.enter(CallState::Throttled, number);
            let permit = self.registry.acquire(&self.group).await;
            if !permit.waited().is_zero() {
                debug!(
                    operation = %operation,
                    group,
                    wait_ms = permit.waited().as_millis() as u64,
                    "Waited for throttle slot"
                );
            }

            self.enter(CallState::Invoking, number);
            if let Some(metrics) = &self.metrics {
                metrics.observe_throttle_wait(group, permit.waited().as_secs_f64());
                metrics.record_attempt(group);
            }

            match self.inner.invoke(args).await {
                Ok(value) => {
                    self.enter(CallState::Succeeded, number);
                    attempts.push(RetryAttempt {
                        number,
                        backoff,
                        throttle_wait: permit.waited(),
                        outcome: AttemptOutcome::Succeeded,
                    });
                    if number > 1 {
                        info!(operation = %operation, attempt = number, "Call succeeded after retry");
                    }
                    if let Some(metrics) = &self.metrics {
                        metrics.record_call(group, &operation, "success");
                    }
                    return (Ok(value), attempts);
                }
                Err(error) => {
                    let retrying = self.policy.should_retry(number, &error);
                    attempts.push(RetryAttempt {
                        number,
                        backoff,
                        throttle_wait: permit.waited(),
                        outcome: AttemptOutcome::Failed { retrying },
                    });

                    if !retrying {
                        self.enter(CallState::Exhausted, number);
                        warn!(
                            operation = %operation,
                            attempts = number,
                            error = %error,
                            "Call failed, giving up"
                        );
                        if let Some(metrics) = &self.metrics {
                            metrics.record_call(group, &operation, "failure");
                        }
                        return (Err(error), attempts);
                    }

                    self.enter(CallState::Failed, number);
                    backoff = self.policy.delay_for(number);
                    info!(
                        operation = %operation,
                        attempt = number,
                        delay_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Call failed, retrying"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_retry(group);
                    }
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl<E: ErrorBounds + ErrorStatus> Operation for CallWrapper<E> {
    type Error = E;

    async fn invoke(&self, args: &Value) -> Result<Value, E> {
        self.invoke_traced(args).await.0
    }
}
