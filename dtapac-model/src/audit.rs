//! Audit results flowing from producers to the submitter.

use serde::{Deserialize, Serialize};

use crate::analysis::{
    AnalysisJustification, AnalysisResponse, AnalysisState, FindingAnalysis, ViolationAnalysis,
    ViolationAnalysisState,
};
use crate::ids::{ComponentId, PolicyViolationId, ProjectId, VulnerabilityId};
use crate::subject::{Finding, Violation};

/// Analysis submission for a finding, in the shape the portfolio accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingAnalysisRequest {
    pub component: ComponentId,
    pub project: ProjectId,
    pub vulnerability: VulnerabilityId,
    #[serde(rename = "analysisState", skip_serializing_if = "Option::is_none")]
    pub state: Option<AnalysisState>,
    #[serde(rename = "analysisJustification", skip_serializing_if = "Option::is_none")]
    pub justification: Option<AnalysisJustification>,
    #[serde(rename = "analysisResponse", skip_serializing_if = "Option::is_none")]
    pub response: Option<AnalysisResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "isSuppressed")]
    pub suppressed: bool,
}

/// Analysis submission for a policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationAnalysisRequest {
    pub component: ComponentId,
    pub policy_violation: PolicyViolationId,
    #[serde(rename = "analysisState", skip_serializing_if = "Option::is_none")]
    pub state: Option<ViolationAnalysisState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "isSuppressed")]
    pub suppressed: bool,
}

/// Unit of work handed to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    Finding(FindingAnalysisRequest),
    Violation(ViolationAnalysisRequest),
}

impl AuditResult {
    /// Pair a finding with its decision. No-op decisions produce nothing.
    pub fn for_finding(finding: &Finding, analysis: FindingAnalysis) -> Option<Self> {
        if analysis.is_noop() {
            return None;
        }

        Some(Self::Finding(FindingAnalysisRequest {
            component: finding.component.uuid,
            project: finding.project.uuid,
            vulnerability: finding.vulnerability.uuid,
            state: analysis.state,
            justification: analysis.justification,
            response: analysis.response,
            comment: analysis.comment.filter(|c| !c.is_empty()),
            suppressed: analysis.suppress,
        }))
    }

    /// Pair a violation with its decision. No-op decisions produce nothing.
    pub fn for_violation(violation: &Violation, analysis: ViolationAnalysis) -> Option<Self> {
        if analysis.is_noop() {
            return None;
        }

        Some(Self::Violation(ViolationAnalysisRequest {
            component: violation.component.uuid,
            policy_violation: violation.policy_violation.uuid,
            state: analysis.state,
            comment: analysis.comment.filter(|c| !c.is_empty()),
            suppressed: analysis.suppress,
        }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuditResult::Finding(_) => "finding",
            AuditResult::Violation(_) => "violation",
        }
    }
}

impl From<FindingAnalysisRequest> for AuditResult {
    fn from(value: FindingAnalysisRequest) -> Self {
        Self::Finding(value)
    }
}

impl From<ViolationAnalysisRequest> for AuditResult {
    fn from(value: ViolationAnalysisRequest) -> Self {
        Self::Violation(value)
    }
}
