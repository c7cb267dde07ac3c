//! One-call construction of a throttled REST client
//!
//! [`ThrottledClient`] ties the pieces together for one [`Config`]:
//! transport → [`RestClient`] → raw operation tree → [`TreeBuilder`] →
//! wrapped tree. Each client owns its own [`ThrottleRegistry`] unless one is
//! passed in with [`ThrottledClientBuilder::shared_registry`].

use std::sync::Arc;

use octopace_core::config::{Config, ValidationError};
use octopace_core::domain::{DomainError, GroupId};
use octopace_core::ports::{OperationTree, SharedOperation};
use octopace_telemetry::MetricsRegistry;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::classifier::GroupClassifier;
use crate::client::RestClient;
use crate::rate_limit::ThrottleRegistry;
use crate::retry::{RetryAttempt, RetryPolicy};
use crate::transport::TransportError;
use crate::tree::TreeBuilder;
use crate::ApiError;

/// Errors raised while building a [`ThrottledClient`]
#[derive(Debug, Error)]
pub enum ConfigureError {
    /// The configuration failed validation
    #[error("Invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),

    /// The HTTP client could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A group or operation name is malformed
    #[error(transparent)]
    Domain(#[from] DomainError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Throttled, retrying client built from configuration
#[derive(Debug)]
pub struct ThrottledClient {
    rest: Arc<RestClient>,
    raw: OperationTree<ApiError>,
    wrapped: OperationTree<ApiError>,
    builder: TreeBuilder,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ThrottledClient {
    /// Builds a client with its own throttle registry
    pub fn from_config(config: &Config) -> Result<Self, ConfigureError> {
        Self::builder(config).build()
    }

    pub fn builder(config: &Config) -> ThrottledClientBuilder {
        ThrottledClientBuilder::new(config.clone())
    }

    /// Throttled operation `namespace.name`
    pub fn operation(&self, namespace: &str, name: &str) -> Option<&SharedOperation<ApiError>> {
        self.wrapped.operation(namespace, name)
    }

    /// The throttled tree
    pub fn tree(&self) -> &OperationTree<ApiError> {
        &self.wrapped
    }

    /// The unthrottled tree the wrapped one mirrors
    pub fn raw_tree(&self) -> &OperationTree<ApiError> {
        &self.raw
    }

    /// Group `namespace.name` is paced by
    pub fn group_of(&self, namespace: &str, name: &str) -> GroupId {
        self.builder.classifier().classify(namespace, name)
    }

    /// Calls `namespace.name` and returns the record of every attempt
    ///
    /// Returns `None` when no such operation exists. Pacing goes through the
    /// same registry as [`ThrottledClient::operation`].
    pub async fn call_traced(
        &self,
        namespace: &str,
        name: &str,
        args: &Value,
    ) -> Option<(Result<Value, ApiError>, Vec<RetryAttempt>)> {
        let raw = self.raw.operation(namespace, name)?;
        let wrapper = self.builder.wrap(namespace, name, Arc::clone(raw));
        Some(wrapper.invoke_traced(args).await)
    }

    pub fn registry(&self) -> &Arc<ThrottleRegistry> {
        self.builder.registry()
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.builder.policy()
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsRegistry>> {
        self.metrics.as_ref()
    }

    pub fn rest_client(&self) -> &Arc<RestClient> {
        &self.rest
    }
}

/// Builder for [`ThrottledClient`]
#[derive(Debug)]
pub struct ThrottledClientBuilder {
    config: Config,
    registry: Option<Arc<ThrottleRegistry>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ThrottledClientBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: None,
            metrics: None,
        }
    }

    /// Uses an existing registry instead of creating one
    ///
    /// Clients built with the same registry pace each other. The registry's
    /// own intervals apply; `rate_limits` from this configuration is ignored.
    pub fn shared_registry(mut self, registry: Arc<ThrottleRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Records call metrics in `metrics`
    pub fn metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<ThrottledClient, ConfigureError> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            return Err(ConfigureError::Invalid(errors));
        }

        let classifier = GroupClassifier::from_config(&self.config.grouping)?;
        let shared = self.registry.is_some();
        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(ThrottleRegistry::from_config(
                &self.config.rate_limits,
                classifier.default_group(),
            )?),
        };
        let policy = RetryPolicy::from_config(&self.config.retry);

        let mut builder = TreeBuilder::new(classifier, registry, policy);
        if let Some(metrics) = &self.metrics {
            builder = builder.with_metrics(Arc::clone(metrics));
        }

        let rest = Arc::new(RestClient::new(&self.config.transport)?);
        let raw = rest.operation_tree();
        let wrapped = builder.build(&raw);

        info!(
            root = %rest.root(),
            operations = wrapped.operation_count(),
            shared_registry = shared,
            retries = builder.policy().retries(),
            "Throttled client ready"
        );
        Ok(ThrottledClient {
            rest,
            raw,
            wrapped,
            builder,
            metrics: self.metrics,
        })
    }
}
