use std::{fmt, marker::PhantomData, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};

use super::DecisionClient;
use crate::error::{AuditError, Result};
use crate::model::{Finding, FindingAnalysis, Violation, ViolationAnalysis};

/// Resolve the decision path for a policy package: `<root>/analysis`.
pub fn analysis_path(policy_root: &str) -> String {
    let root = policy_root.trim_matches('/');
    if root.is_empty() {
        "analysis".to_string()
    } else {
        format!("{root}/analysis")
    }
}

/// Binds a [`DecisionClient`] to one policy package and maps subjects of type
/// `S` to analyses of type `D`.
///
/// An undefined policy result maps to `D::default()`, which for both analysis
/// types is the no-op decision.
pub struct PolicyAuditor<S, D> {
    client: Arc<dyn DecisionClient>,
    policy_path: String,
    _marker: PhantomData<fn(&S) -> D>,
}

pub type FindingAuditor = PolicyAuditor<Finding, FindingAnalysis>;
pub type ViolationAuditor = PolicyAuditor<Violation, ViolationAnalysis>;

impl<S, D> PolicyAuditor<S, D>
where
    S: Serialize,
    D: DeserializeOwned + Default,
{
    pub fn new(client: Arc<dyn DecisionClient>, policy_root: &str) -> Self {
        Self {
            client,
            policy_path: analysis_path(policy_root),
            _marker: PhantomData,
        }
    }

    pub fn policy_path(&self) -> &str {
        &self.policy_path
    }

    pub async fn audit(&self, subject: &S) -> Result<D> {
        let input = serde_json::to_value(subject)?;
        match self.client.decide(&self.policy_path, input).await? {
            Some(result) => serde_json::from_value(result).map_err(|err| {
                AuditError::InvalidResponse(format!(
                    "policy {} returned an unexpected decision: {err}",
                    self.policy_path
                ))
            }),
            None => Ok(D::default()),
        }
    }
}

impl<S, D> Clone for PolicyAuditor<S, D> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            policy_path: self.policy_path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<S, D> fmt::Debug for PolicyAuditor<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyAuditor")
            .field("policy_path", &self.policy_path)
            .finish_non_exhaustive()
    }
}

/// The configured auditing categories. At least one must be present.
#[derive(Clone, Debug)]
pub struct Auditors {
    findings: Option<FindingAuditor>,
    violations: Option<ViolationAuditor>,
}

impl Auditors {
    pub fn new(
        findings: Option<FindingAuditor>,
        violations: Option<ViolationAuditor>,
    ) -> Result<Self> {
        if findings.is_none() && violations.is_none() {
            return Err(AuditError::Configuration(
                "neither finding nor violation auditing is configured".into(),
            ));
        }
        Ok(Self {
            findings,
            violations,
        })
    }

    /// Build auditors sharing one decision client from optional policy roots.
    pub fn from_policy_paths(
        client: Arc<dyn DecisionClient>,
        finding_policy: Option<&str>,
        violation_policy: Option<&str>,
    ) -> Result<Self> {
        Self::new(
            finding_policy.map(|root| FindingAuditor::new(Arc::clone(&client), root)),
            violation_policy.map(|root| ViolationAuditor::new(Arc::clone(&client), root)),
        )
    }

    pub fn findings(&self) -> Option<&FindingAuditor> {
        self.findings.as_ref()
    }

    pub fn violations(&self) -> Option<&ViolationAuditor> {
        self.violations.as_ref()
    }
}
