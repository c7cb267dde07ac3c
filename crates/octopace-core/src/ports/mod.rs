//! Port definitions (hexagonal architecture interfaces)
//!
//! ## Ports Overview
//!
//! - [`Operation`] - A single callable endpoint of a remote API client
//! - [`ErrorStatus`] - Status-code access for retry classification
//! - [`OperationTree`] - A client's namespaced surface of operations

pub mod operation;
pub mod tree;

pub use operation::{ErrorStatus, Operation};
pub use tree::{Entry, ErrorBounds, Namespace, OperationTree, SharedOperation, TreeShape};
