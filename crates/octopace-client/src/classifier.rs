//! Operation → rate-limit group mapping
//!
//! Lookup order for `(namespace, name)`:
//! 1. an explicit per-operation override,
//! 2. the namespace mapping,
//! 3. the default group.
//!
//! Classification is a pure function of the configuration and cannot fail.

use std::collections::BTreeMap;

use octopace_core::config::GroupingConfig;
use octopace_core::domain::{DomainError, GroupId, OperationId};

/// Assigns each operation to exactly one rate-limit group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupClassifier {
    default_group: GroupId,
    namespaces: BTreeMap<String, GroupId>,
    /// namespace → operation name → group
    operations: BTreeMap<String, BTreeMap<String, GroupId>>,
}

impl GroupClassifier {
    /// A classifier sending everything to `default_group`
    pub fn new(default_group: GroupId) -> Self {
        Self {
            default_group,
            namespaces: BTreeMap::new(),
            operations: BTreeMap::new(),
        }
    }

    /// Maps every operation of `namespace` to `group`
    pub fn with_namespace(mut self, namespace: impl Into<String>, group: GroupId) -> Self {
        self.namespaces.insert(namespace.into(), group);
        self
    }

    /// Maps a single operation to `group`, overriding its namespace
    pub fn with_operation(mut self, operation: &OperationId, group: GroupId) -> Self {
        self.operations
            .entry(operation.namespace().to_string())
            .or_default()
            .insert(operation.name().to_string(), group);
        self
    }

    /// Builds a classifier from the `grouping` configuration section
    pub fn from_config(config: &GroupingConfig) -> Result<Self, DomainError> {
        let mut classifier = Self::new(GroupId::new(config.default_group.as_str())?);
        for (namespace, group) in &config.namespaces {
            classifier = classifier.with_namespace(namespace.as_str(), GroupId::new(group.as_str())?);
        }
        for (operation, group) in &config.operations {
            let id: OperationId = operation.parse()?;
            classifier = classifier.with_operation(&id, GroupId::new(group.as_str())?);
        }
        Ok(classifier)
    }

    /// Group of the operation `namespace.name`
    pub fn classify(&self, namespace: &str, name: &str) -> GroupId {
        self.operations
            .get(namespace)
            .and_then(|ops| ops.get(name))
            .or_else(|| self.namespaces.get(namespace))
            .unwrap_or(&self.default_group)
            .clone()
    }

    /// Group used for unmapped namespaces
    pub fn default_group(&self) -> &GroupId {
        &self.default_group
    }
}

impl Default for GroupClassifier {
    /// `search` namespace → `search`, everything else → `core`
    fn default() -> Self {
        Self::new(GroupId::core()).with_namespace("search", GroupId::search())
    }
}
