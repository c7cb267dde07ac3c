//! Throttled mirror of an operation tree
//!
//! [`TreeBuilder::build`] walks a raw [`OperationTree`] and returns a tree
//! with the same namespaces and entry names, where every operation is
//! replaced by a [`CallWrapper`] for its group. Non-callable values are
//! copied as they are.

use std::sync::Arc;

use octopace_core::ports::{Entry, ErrorBounds, ErrorStatus, OperationTree, SharedOperation};
use octopace_telemetry::MetricsRegistry;
use tracing::debug;

use crate::classifier::GroupClassifier;
use crate::dispatch::CallWrapper;
use crate::rate_limit::ThrottleRegistry;
use crate::retry::RetryPolicy;

/// Wraps operations with the pacing and retry settings of one configuration
///
/// All wrappers built by the same builder share its [`ThrottleRegistry`].
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    classifier: GroupClassifier,
    registry: Arc<ThrottleRegistry>,
    policy: Arc<RetryPolicy>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl TreeBuilder {
    /// Builder whose wrappers share `registry` and a single copy of `policy`
    pub fn new(
        classifier: GroupClassifier,
        registry: Arc<ThrottleRegistry>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            classifier,
            registry,
            policy: Arc::new(policy),
            metrics: None,
        }
    }

    /// Attaches a metrics registry to every wrapper built from now on
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Maps each operation to its rate-limit group
    pub fn classifier(&self) -> &GroupClassifier {
        &self.classifier
    }

    /// Throttle state shared by every wrapper this builder makes
    pub fn registry(&self) -> &Arc<ThrottleRegistry> {
        &self.registry
    }

    /// Retry policy applied to every wrapped call
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wraps a single operation
    pub fn wrap<E>(&self, namespace: &str, name: &str, operation: SharedOperation<E>) -> CallWrapper<E>
    where
        E: ErrorBounds + ErrorStatus,
    {
        let group = self.classifier.classify(namespace, name);
        let wrapper = CallWrapper::new(
            namespace,
            name,
            group,
            operation,
            Arc::clone(&self.registry),
            Arc::clone(&self.policy),
        );
        match &self.metrics {
            Some(metrics) => wrapper.with_metrics(Arc::clone(metrics)),
            None => wrapper,
        }
    }

    /// Builds the throttled mirror of `raw`
    pub fn build<E>(&self, raw: &OperationTree<E>) -> OperationTree<E>
    where
        E: ErrorBounds + ErrorStatus,
    {
        let mut wrapped = OperationTree::new();
        for (namespace, entries) in raw.namespaces() {
            // Keep empty namespaces too.
            let target = wrapped.namespace_mut(namespace);
            for (name, entry) in entries.entries() {
                let mirrored = match entry {
                    Entry::Operation(operation) => {
                        let wrapper = self.wrap(namespace, name, Arc::clone(operation));
                        Entry::Operation(Arc::new(wrapper) as SharedOperation<E>)
                    }
                    Entry::Value(value) => Entry::Value(value.clone()),
                };
                target.insert(name, mirrored);
            }
        }
        debug!(
            namespaces = raw.namespaces().count(),
            operations = wrapped.operation_count(),
            "Built throttled operation tree"
        );
        wrapped
    }
}
