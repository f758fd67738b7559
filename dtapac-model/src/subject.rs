//! Subjects submitted to the policy engine as decision input.

use serde::{Deserialize, Serialize};

use crate::portfolio::{Component, PolicyViolation, Project, Vulnerability};

/// A vulnerability detected in one component of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub component: Component,
    pub project: Project,
    pub vulnerability: Vulnerability,
}

impl Finding {
    pub fn new(component: Component, project: Project, vulnerability: Vulnerability) -> Self {
        Self {
            component,
            project,
            vulnerability,
        }
    }
}

/// A policy violation raised against one component of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub component: Component,
    pub project: Project,
    pub policy_violation: PolicyViolation,
}

impl Violation {
    pub fn new(component: Component, project: Project, policy_violation: PolicyViolation) -> Self {
        Self {
            component,
            project,
            policy_violation,
        }
    }

    /// Build a subject from a per-project violation listing entry.
    ///
    /// The listing embeds the affected component; entries without one cannot
    /// be addressed when submitting an analysis and yield `None`. The embedded
    /// component and project are lifted out of the violation record.
    pub fn from_listing(project: &Project, mut policy_violation: PolicyViolation) -> Option<Self> {
        let component = policy_violation.component.take()?;
        let project = policy_violation
            .project
            .take()
            .unwrap_or_else(|| project.clone());
        Some(Self::new(component, project, policy_violation))
    }
}
