//! Core data model definitions shared across dtapac crates.
//!
//! Wire shapes follow the Dependency-Track REST API (camelCase fields,
//! SCREAMING_SNAKE_CASE enums) so the same types can be fed to the policy
//! engine as decision input and sent back to the portfolio as submissions.
#![allow(missing_docs)]

pub mod analysis;
pub mod audit;
pub mod ids;
pub mod notification;
pub mod opa;
pub mod portfolio;
pub mod subject;

// Intentionally curated re-exports for downstream consumers.
pub use analysis::{
    AnalysisJustification, AnalysisResponse, AnalysisState, FindingAnalysis,
    ViolationAnalysis, ViolationAnalysisState,
};
pub use audit::{AuditResult, FindingAnalysisRequest, ViolationAnalysisRequest};
pub use ids::{ComponentId, PolicyViolationId, ProjectId, VulnerabilityId};
pub use notification::{
    NewVulnerabilitySubject, Notification, NotificationEnvelope,
    NotificationGroup, PolicyViolationSubject,
};
pub use opa::{BundleStatus, OpaStatus};
pub use portfolio::{
    Component, FindingRecord, Page, Policy, PolicyCondition, PolicyViolation,
    Project, Severity, Tag, Vulnerability,
};
pub use subject::{Finding, Violation};
