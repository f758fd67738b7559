//! Webhook notifications pushed by the portfolio.

use serde::{Deserialize, Serialize};

use crate::portfolio::{Component, PolicyViolation, Project, Vulnerability};

/// Outer wrapper of a webhook body: `{"notification": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationGroup {
    NewVulnerability,
    PolicyViolation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    pub group: NotificationGroup,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub subject: serde_json::Value,
}

/// Subject of a `NEW_VULNERABILITY` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVulnerabilitySubject {
    pub component: Component,
    pub vulnerability: Vulnerability,
    #[serde(default)]
    pub affected_projects: Vec<Project>,
}

/// Subject of a `POLICY_VIOLATION` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyViolationSubject {
    pub component: Component,
    pub project: Project,
    pub policy_violation: PolicyViolation,
}
