//! Domain error types
//!
//! This module defines error types for domain value construction, such as
//! malformed group names or operation identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Group identifier is empty or contains unsupported characters
    #[error("Invalid group id: {0}")]
    InvalidGroupId(String),

    /// Operation identifier is not of the form `namespace.name`
    #[error("Invalid operation id: {0}")]
    InvalidOperationId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
