//! Operation tree model
//!
//! A client surface is a two-level tree: namespaces (e.g. `repos`) holding
//! named entries (e.g. `createRelease`). Entries are either callable
//! operations or plain values that are carried along untouched.
//!
//! Both the raw client and the throttled client are expressed as an
//! [`OperationTree`], so the wrapped tree can be compared structurally with
//! the one it was built from via [`OperationTree::shape`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::operation::Operation;
use crate::domain::OperationId;

/// Bounds every operation error type satisfies
pub trait ErrorBounds: std::error::Error + Send + Sync + 'static {}

impl<T> ErrorBounds for T where T: std::error::Error + Send + Sync + 'static {}

/// Shared handle to an operation with error type `E`
pub type SharedOperation<E> = Arc<dyn Operation<Error = E>>;

/// A single entry of a namespace
pub enum Entry<E: ErrorBounds> {
    /// A callable operation
    Operation(SharedOperation<E>),
    /// A non-callable value, passed through as-is
    Value(Value),
}

impl<E: ErrorBounds> Entry<E> {
    /// Returns the operation if this entry is callable
    pub fn as_operation(&self) -> Option<&SharedOperation<E>> {
        match self {
            Entry::Operation(op) => Some(op),
            Entry::Value(_) => None,
        }
    }

    /// Returns the value if this entry is not callable
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Operation(_) => None,
            Entry::Value(v) => Some(v),
        }
    }
}

impl<E: ErrorBounds> Clone for Entry<E> {
    fn clone(&self) -> Self {
        match self {
            Entry::Operation(op) => Entry::Operation(Arc::clone(op)),
            Entry::Value(v) => Entry::Value(v.clone()),
        }
    }
}

impl<E: ErrorBounds> fmt::Debug for Entry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Operation(_) => f.write_str("Operation"),
            Entry::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// A named group of entries
pub struct Namespace<E: ErrorBounds> {
    entries: BTreeMap<String, Entry<E>>,
}

impl<E: ErrorBounds> Namespace<E> {
    /// Creates an empty namespace
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts or replaces an entry
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry<E>) {
        self.entries.insert(name.into(), entry);
    }

    /// Looks up an entry by name
    pub fn get(&self, name: &str) -> Option<&Entry<E>> {
        self.entries.get(name)
    }

    /// Looks up a callable operation by name
    pub fn operation(&self, name: &str) -> Option<&SharedOperation<E>> {
        self.entries.get(name).and_then(Entry::as_operation)
    }

    /// Iterates over `(name, entry)` pairs in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry<E>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries (callable or not)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the namespace has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: ErrorBounds> Default for Namespace<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ErrorBounds> Clone for Namespace<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<E: ErrorBounds> fmt::Debug for Namespace<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// Namespace name → sorted entry names
///
/// Two trees with equal shapes expose exactly the same surface.
pub type TreeShape = BTreeMap<String, Vec<String>>;

/// A client surface: namespaces of operations and values
pub struct OperationTree<E: ErrorBounds> {
    namespaces: BTreeMap<String, Namespace<E>>,
}

impl<E: ErrorBounds> OperationTree<E> {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self {
            namespaces: BTreeMap::new(),
        }
    }

    /// Adds a callable operation, creating the namespace if needed
    pub fn insert_operation(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        operation: SharedOperation<E>,
    ) {
        self.namespace_mut(namespace)
            .insert(name, Entry::Operation(operation));
    }

    /// Adds a non-callable value, creating the namespace if needed
    pub fn insert_value(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: Value,
    ) {
        self.namespace_mut(namespace).insert(name, Entry::Value(value));
    }

    /// Returns the namespace, inserting an empty one if absent
    pub fn namespace_mut(&mut self, namespace: impl Into<String>) -> &mut Namespace<E> {
        self.namespaces.entry(namespace.into()).or_default()
    }

    /// Looks up a namespace
    pub fn namespace(&self, namespace: &str) -> Option<&Namespace<E>> {
        self.namespaces.get(namespace)
    }

    /// Iterates over `(name, namespace)` pairs in name order
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &Namespace<E>)> {
        self.namespaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a callable operation
    pub fn operation(&self, namespace: &str, name: &str) -> Option<&SharedOperation<E>> {
        self.namespace(namespace).and_then(|ns| ns.operation(name))
    }

    /// Looks up a callable operation by its dotted id
    pub fn operation_by_id(&self, id: &OperationId) -> Option<&SharedOperation<E>> {
        self.operation(id.namespace(), id.name())
    }

    /// Looks up any entry
    pub fn entry(&self, namespace: &str, name: &str) -> Option<&Entry<E>> {
        self.namespace(namespace).and_then(|ns| ns.get(name))
    }

    /// Total number of callable operations across all namespaces
    pub fn operation_count(&self) -> usize {
        self.namespaces
            .values()
            .flat_map(|ns| ns.entries.values())
            .filter(|e| e.as_operation().is_some())
            .count()
    }

    /// Structural summary used to compare two trees
    pub fn shape(&self) -> TreeShape {
        self.namespaces
            .iter()
            .map(|(name, ns)| (name.clone(), ns.entries.keys().cloned().collect()))
            .collect()
    }
}

impl<E: ErrorBounds> Default for OperationTree<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ErrorBounds> Clone for OperationTree<E> {
    fn clone(&self) -> Self {
        Self {
            namespaces: self.namespaces.clone(),
        }
    }
}

impl<E: ErrorBounds> fmt::Debug for OperationTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.namespaces.iter()).finish()
    }
}
