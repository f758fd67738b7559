//! The audit pipeline.
//!
//! ```text
//! bundle watcher -> trigger debouncer -> portfolio scanner --+
//!                                                            +--> merge -> submitter -> portfolio
//! live receiver ---------------------------------------------+
//! ```
//!
//! Every stage is a task owned by the [`AuditOrchestrator`] and shares one
//! cancellation token. The submitter is the only stage that writes to the
//! portfolio.

mod merge;
mod orchestrator;
mod scanner;
mod submitter;
mod tasks;
mod trigger;

pub use merge::merge;
pub use orchestrator::{AuditOrchestrator, LiveSource, PortfolioAnalysis};
pub use scanner::{PassOutcome, PassSummary, PortfolioScanner};
pub use submitter::{SubmissionStats, Submitter, log_dropped_result};
pub use tasks::{TaskFailure, TaskGroup, cancellable};
pub use trigger::{TriggerDebouncer, TriggerOffer, TriggerSignal, trigger_channel};
