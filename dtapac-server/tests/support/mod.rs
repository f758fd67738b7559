#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dtapac_core::model::{
    AuditResult, Component, ComponentId, PolicyViolation, PolicyViolationId, Project, ProjectId,
    Vulnerability, VulnerabilityId,
};
use dtapac_core::{Auditors, DecisionClient, Result};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};
use uuid::Uuid;

pub const FINDING_POLICY: &str = "dtapac/finding";
pub const VIOLATION_POLICY: &str = "dtapac/violation";

pub struct FnDecisions<F> {
    decide: F,
    pub calls: AtomicUsize,
}

impl<F> FnDecisions<F>
where
    F: Fn(&str, &Value) -> Result<Option<Value>> + Send + Sync,
{
    pub fn new(decide: F) -> Arc<Self> {
        Arc::new(Self {
            decide,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl<F> DecisionClient for FnDecisions<F>
where
    F: Fn(&str, &Value) -> Result<Option<Value>> + Send + Sync,
{
    async fn decide(&self, policy_path: &str, input: Value) -> Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.decide)(policy_path, &input)
    }
}

pub fn auditors(client: Arc<dyn DecisionClient>) -> Auditors {
    Auditors::from_policy_paths(client, Some(FINDING_POLICY), Some(VIOLATION_POLICY))
        .expect("both categories configured")
}

pub fn project(name: &str) -> Project {
    Project {
        uuid: ProjectId(Uuid::new_v4()),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn component(name: &str) -> Component {
    Component {
        uuid: ComponentId(Uuid::new_v4()),
        name: name.to_string(),
        version: Some("2.4.1".into()),
        ..Default::default()
    }
}

pub fn vulnerability(vuln_id: &str) -> Vulnerability {
    Vulnerability {
        uuid: VulnerabilityId(Uuid::new_v4()),
        vuln_id: vuln_id.to_string(),
        source: "NVD".into(),
        ..Default::default()
    }
}

pub fn policy_violation() -> PolicyViolation {
    PolicyViolation {
        uuid: PolicyViolationId(Uuid::new_v4()),
        violation_type: "LICENSE".into(),
        ..Default::default()
    }
}

pub fn new_vulnerability_body(
    component: &Component,
    vulnerability: &Vulnerability,
    projects: &[Project],
) -> Value {
    json!({
        "notification": {
            "level": "INFORMATIONAL",
            "scope": "PORTFOLIO",
            "group": "NEW_VULNERABILITY",
            "title": "New Vulnerability Identified",
            "subject": {
                "component": component,
                "vulnerability": vulnerability,
                "affectedProjects": projects,
            }
        }
    })
}

pub fn policy_violation_body(
    component: &Component,
    project: &Project,
    violation: &PolicyViolation,
) -> Value {
    json!({
        "notification": {
            "level": "INFORMATIONAL",
            "scope": "PORTFOLIO",
            "group": "POLICY_VIOLATION",
            "title": "Policy Violation",
            "subject": {
                "component": component,
                "project": project,
                "policyViolation": violation,
            }
        }
    })
}

/// Receive exactly `n` queued results.
pub async fn take(rx: &mut mpsc::Receiver<AuditResult>, n: usize) -> Vec<AuditResult> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        match rx.recv().await {
            Some(result) => out.push(result),
            None => break,
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub message: String,
    pub fields: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.message == message)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }
}

struct CaptureLayer(CapturedLogs);

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.0.lock().unwrap().push(CapturedEvent {
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Capture log events on the current thread until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = Registry::default().with(CaptureLayer(logs.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
