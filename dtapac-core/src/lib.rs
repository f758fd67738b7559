//! # dtapac core
//!
//! Policy-driven triage of portfolio findings and policy violations.
//!
//! ## Overview
//!
//! Audit results come from two kinds of producers: a live receiver reacting to
//! portfolio webhooks, and a portfolio scanner that re-evaluates everything
//! whenever the watched policy bundle changes. Both feed a single submitter so
//! that writes to the portfolio never race.
//!
//! ## Architecture
//!
//! - [`decision`]: policy engine client and typed auditors
//! - [`portfolio`]: portfolio API client and paging helpers
//! - [`watch`]: policy bundle revision watcher
//! - [`pipeline`]: trigger debouncing, portfolio scanning, fan-in, submission,
//!   and the orchestrator that supervises them

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod decision;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod portfolio;
pub mod watch;

pub use dtapac_model as model;

pub use decision::{
    Auditors, DecisionClient, FindingAuditor, OpaClient, PolicyAuditor, ViolationAuditor,
};
pub use error::{AuditError, Result};
pub use logging::service_span;
pub use pipeline::{
    AuditOrchestrator, LiveSource, PassOutcome, PassSummary, PortfolioAnalysis, PortfolioScanner,
    SubmissionStats, Submitter, TaskFailure, TaskGroup, TriggerDebouncer, TriggerSignal,
    log_dropped_result, merge,
};
pub use portfolio::{DependencyTrackClient, PageOptions, PortfolioClient, fetch_all};
pub use watch::BundleWatcher;
