//! Integration tests for octopace-client
//!
//! Uses wiremock to simulate the REST API and verifies end-to-end behavior
//! of the throttled client: transport headers and proxying, retries, and
//! request pacing.

mod common;

mod test_retry;
mod test_throttle;
mod test_transport;
