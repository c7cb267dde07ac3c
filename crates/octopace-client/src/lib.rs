//! Octopace Client - Throttled dispatch over a namespaced REST API
//!
//! Provides:
//! - A REST adapter exposing a static catalogue of API operations
//! - Per-group and global request pacing shared by every call
//! - Retries that go back through the same pacing gates
//! - Proxy and default-header transport configuration
//!
//! ## Modules
//!
//! - [`transport`] - Builds the HTTP client (proxy, default headers, timeout)
//! - [`endpoints`] - Static registry of namespaces, operations and HTTP routes
//! - [`client`] - REST adapter implementing the `Operation` port
//! - [`classifier`] - Maps operations to rate-limit groups
//! - [`rate_limit`] - Pacing primitive and per-group throttle registry
//! - [`retry`] - Retry decisions and backoff delays
//! - [`dispatch`] - Call wrapper combining throttling and retries
//! - [`tree`] - Builds a throttled mirror of an operation tree
//! - [`throttled`] - One-call construction from configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use octopace_client::ThrottledClient;
//! use octopace_core::config::ConfigBuilder;
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ConfigBuilder::new().credential("ghp_example").build();
//! let client = ThrottledClient::from_config(&config)?;
//! if let Some(get_repo) = client.operation("repos", "get") {
//!     let repo = get_repo.invoke(&json!({"owner": "rust-lang", "repo": "rust"})).await?;
//!     println!("{}", repo["full_name"]);
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod client;
pub mod dispatch;
pub mod endpoints;
pub mod rate_limit;
pub mod retry;
pub mod throttled;
pub mod transport;
pub mod tree;

use octopace_core::ports::ErrorStatus;
use serde_json::Value;
use thiserror::Error;

pub use classifier::GroupClassifier;
pub use client::RestClient;
pub use dispatch::CallWrapper;
pub use rate_limit::{Pacer, ThrottlePermit, ThrottleRegistry};
pub use retry::{AttemptOutcome, RetryAttempt, RetryPolicy};
pub use throttled::{ConfigureError, ThrottledClient, ThrottledClientBuilder};
pub use transport::TransportError;
pub use tree::TreeBuilder;

/// Errors returned by REST operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote service answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Message extracted from the response body, or the status reason
        message: String,
        /// Parsed JSON body, when the response carried one
        body: Option<Value>,
    },

    /// A network-level error occurred (connect, proxy, TLS, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The arguments do not fit the operation's route
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The response could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ErrorStatus for ApiError {
    fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidArguments(_) | ApiError::InvalidResponse(_) => None,
        }
    }
}
