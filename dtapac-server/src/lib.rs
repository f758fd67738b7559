//! # dtapac server
//!
//! HTTP surface and process wiring for the audit service.
//!
//! - [`api`]: webhook receiver for Dependency-Track notifications and OPA
//!   status reports
//! - [`infra`]: builds concrete clients from configuration and assembles the
//!   audit orchestrator
#![allow(missing_docs)]

pub mod api;
pub mod infra;

pub use api::{ApiServer, AppState};
