//! Analysis decisions returned by the policy engine.
//!
//! A decision whose fields are all unset is the "no-op" decision: the policy
//! had nothing to say about the subject and nothing must be submitted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisState {
    Exploitable,
    InTriage,
    FalsePositive,
    NotAffected,
    Resolved,
    NotSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisJustification {
    CodeNotPresent,
    CodeNotReachable,
    RequiresConfiguration,
    RequiresDependency,
    RequiresEnvironment,
    ProtectedByCompiler,
    ProtectedAtRuntime,
    ProtectedAtPerimeter,
    ProtectedByMitigatingControl,
    NotSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisResponse {
    CanNotFix,
    WillNotFix,
    Update,
    Rollback,
    WorkaroundAvailable,
    NotSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationAnalysisState {
    Approved,
    Rejected,
    NotSet,
}

/// Policy decision for a vulnerability finding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindingAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<AnalysisState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<AnalysisJustification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<AnalysisResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub suppress: bool,
}

impl FindingAnalysis {
    /// True when the decision carries nothing worth submitting. An empty
    /// comment counts as absent.
    pub fn is_noop(&self) -> bool {
        self.state.is_none()
            && self.justification.is_none()
            && self.response.is_none()
            && blank(&self.comment)
            && !self.suppress
    }
}

/// Policy decision for a policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ViolationAnalysisState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub suppress: bool,
}

impl ViolationAnalysis {
    pub fn is_noop(&self) -> bool {
        self.state.is_none() && blank(&self.comment) && !self.suppress
    }
}

fn blank(comment: &Option<String>) -> bool {
    comment.as_deref().is_none_or(str::is_empty)
}
