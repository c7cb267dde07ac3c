//! Octopace Core - Domain types, operation port and configuration
//!
//! This crate contains the pieces shared by every Octopace adapter:
//! - **Domain values** - `GroupId`, `OperationId` and domain errors
//! - **Port definitions** - the `Operation` trait a remote client implements,
//!   and the `OperationTree` model of a client's callable surface
//! - **Configuration** - YAML-backed settings for transport, rate limits,
//!   grouping, retries and logging
//!
//! # Architecture
//!
//! The dispatch layer in `octopace-client` only depends on the port traits
//! defined here. Concrete remote clients are adapters that implement
//! [`ports::Operation`].

pub mod config;
pub mod domain;
pub mod ports;
