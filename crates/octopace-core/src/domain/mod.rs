//! Domain values
//!
//! - Newtypes for rate-limit group names and operation identifiers
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::*;
