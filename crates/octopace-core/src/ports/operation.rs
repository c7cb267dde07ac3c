//! Remote operation port (driven/secondary port)
//!
//! An [`Operation`] is one callable endpoint of a remote API client. The
//! dispatch layer never looks inside an operation: it only invokes it with
//! the caller's arguments and inspects the outcome.
//!
//! ## Design Notes
//!
//! - Arguments and results are `serde_json::Value` so that every operation
//!   of a client shares one call signature.
//! - The error type is an associated type. Wrappers surface the adapter's
//!   own error unchanged rather than converting it.

use async_trait::async_trait;
use serde_json::Value;

/// A single callable operation of a remote API client
#[async_trait]
pub trait Operation: Send + Sync {
    /// Error produced by a failed invocation
    type Error: std::error::Error + Send + Sync + 'static;

    /// Invoke the operation with the given arguments
    ///
    /// Implementations must be safe to call concurrently and repeatedly with
    /// the same arguments.
    async fn invoke(&self, args: &Value) -> Result<Value, Self::Error>;
}

/// Exposes an HTTP-style status code carried by an error, if any
///
/// Used by retry policies that exclude specific statuses from retrying.
pub trait ErrorStatus {
    /// The status code of the failed response, or `None` for errors that
    /// never reached the remote service
    fn status(&self) -> Option<u16> {
        None
    }
}
