//! Call command - Invoke one operation through the throttled client
//!
//! `octopace call search.repos --args '{"q":"tokio"}' --repeat 3 --show-attempts`
//! issues the call three times in a row. Each call (and each retry) waits on
//! the operation's group gate, so the attempt lines show the pacing at work.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use octopace_client::{ApiError, AttemptOutcome, RetryAttempt, ThrottledClient};
use octopace_core::domain::OperationId;
use octopace_telemetry::MetricsRegistry;
use serde_json::{json, Value};
use tracing::info;

use super::Context;
use crate::output::OutputFormatter;

/// Arguments for the call subcommand
#[derive(Debug, clap::Args)]
pub struct CallCommand {
    /// Operation to call, as `namespace.operation` (e.g. `repos.get`)
    pub operation: String,

    /// Arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,

    /// Number of times to issue the call
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Print every attempt with its backoff and throttle wait
    #[arg(long)]
    pub show_attempts: bool,

    /// Print Prometheus metrics after the calls
    #[arg(long)]
    pub metrics: bool,
}

impl CallCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let id: OperationId = self
            .operation
            .parse()
            .with_context(|| format!("Invalid operation name '{}'", self.operation))?;
        let args = parse_args(&self.args)?;

        let metrics = if self.metrics {
            Some(Arc::new(MetricsRegistry::new()?))
        } else {
            None
        };
        let mut builder = ThrottledClient::builder(&ctx.config);
        if let Some(metrics) = &metrics {
            builder = builder.metrics(Arc::clone(metrics));
        }
        let client = builder.build().context("Failed to build client")?;

        let group = client.group_of(id.namespace(), id.name());
        info!(operation = %id, group = %group, repeat = self.repeat, "Calling operation");

        let formatter = ctx.format.formatter();
        let mut failures = 0u32;
        let mut last_error = None;

        for call in 1..=self.repeat {
            let (result, attempts) = client
                .call_traced(id.namespace(), id.name(), &args)
                .await
                .with_context(|| format!("Unknown operation '{}'", id))?;

            if ctx.format.is_json() {
                formatter.result(&call_report(call, &result, &attempts, self.show_attempts));
            } else {
                if self.show_attempts {
                    for attempt in &attempts {
                        formatter.info(&describe_attempt(call, attempt));
                    }
                }
                match &result {
                    Ok(value) => formatter.result(value),
                    Err(e) => formatter.error(&format!("{} failed: {}", id, e)),
                }
            }

            if let Err(e) = result {
                failures += 1;
                last_error = Some(e);
            }
        }

        if let Some(metrics) = &metrics {
            let text = metrics.encode()?;
            if ctx.format.is_json() {
                formatter.result(&Value::String(text));
            } else {
                println!("{}", text.trim_end());
            }
        }

        match (self.repeat, last_error) {
            (_, None) => Ok(()),
            (1, Some(e)) => Err(anyhow::Error::new(e).context(format!("{} failed", id))),
            (repeat, Some(_)) => bail!("{} of {} calls to {} failed", failures, repeat, id),
        }
    }
}

fn parse_args(raw: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--args is not valid JSON: {}", raw))?;
    match value {
        Value::Object(_) | Value::Null => Ok(value),
        _ => bail!("--args must be a JSON object"),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn outcome_label(outcome: AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Succeeded => "ok",
        AttemptOutcome::Failed { retrying: true } => "failed, retrying",
        AttemptOutcome::Failed { retrying: false } => "failed",
    }
}

fn describe_attempt(call: u32, attempt: &RetryAttempt) -> String {
    format!(
        "call {} attempt {}: {} (backoff {}ms, throttled {}ms)",
        call,
        attempt.number,
        outcome_label(attempt.outcome),
        millis(attempt.backoff),
        millis(attempt.throttle_wait),
    )
}

fn call_report(
    call: u32,
    result: &Result<Value, ApiError>,
    attempts: &[RetryAttempt],
    show_attempts: bool,
) -> Value {
    let mut report = match result {
        Ok(value) => json!({"call": call, "success": true, "result": value}),
        Err(ApiError::Http {
            status,
            message,
            body,
        }) => json!({
            "call": call,
            "success": false,
            "error": {"status": status, "message": message, "body": body},
        }),
        Err(e) => json!({"call": call, "success": false, "error": {"message": e.to_string()}}),
    };
    if show_attempts {
        report["attempts"] = attempts
            .iter()
            .map(|a| {
                json!({
                    "number": a.number,
                    "outcome": outcome_label(a.outcome),
                    "backoff_ms": millis(a.backoff),
                    "throttle_wait_ms": millis(a.throttle_wait),
                })
            })
            .collect();
    }
    report
}
