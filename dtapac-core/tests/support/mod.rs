//! Test doubles shared by the pipeline integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dtapac_core::model::{
    Component, ComponentId, FindingAnalysisRequest, FindingRecord, Page, PolicyViolation,
    PolicyViolationId, Project, ProjectId, ViolationAnalysisRequest, Vulnerability,
    VulnerabilityId,
};
use dtapac_core::{AuditError, DecisionClient, PageOptions, PortfolioClient, Result};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};
use uuid::Uuid;

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
        version: Some("1.0.0".into()),
        ..Default::default()
    }
}

pub fn finding_record(component_name: &str, vuln_id: &str) -> FindingRecord {
    FindingRecord {
        component: component(component_name),
        vulnerability: Vulnerability {
            uuid: VulnerabilityId(Uuid::new_v4()),
            vuln_id: vuln_id.to_string(),
            source: "NVD".into(),
            ..Default::default()
        },
        analysis: None,
    }
}

pub fn policy_violation(component_name: &str) -> PolicyViolation {
    PolicyViolation {
        uuid: PolicyViolationId(Uuid::new_v4()),
        violation_type: "LICENSE".into(),
        component: Some(component(component_name)),
        ..Default::default()
    }
}

/// Decision client answering from a function of the policy path and input.
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

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Finding(FindingAnalysisRequest),
    Violation(ViolationAnalysisRequest),
}

/// In-memory portfolio with a write target that detects overlapping writes.
#[derive(Default)]
pub struct InMemoryPortfolio {
    projects: Vec<Project>,
    findings: HashMap<ProjectId, Vec<FindingRecord>>,
    violations: HashMap<ProjectId, Vec<PolicyViolation>>,
    failing_findings: HashSet<ProjectId>,
    failing_writes: HashSet<Uuid>,
    block_findings: bool,
    gate_findings: AtomicBool,
    write_delay: Duration,
    in_flight: AtomicBool,
    pub overlaps: AtomicUsize,
    pub writes: Mutex<Vec<Write>>,
    pub finding_fetches: Mutex<Vec<ProjectId>>,
    pub violation_fetches: Mutex<Vec<ProjectId>>,
    pub fetch_started: Notify,
    pub release_findings: Notify,
}

impl InMemoryPortfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(
        mut self,
        project: Project,
        findings: Vec<FindingRecord>,
        violations: Vec<PolicyViolation>,
    ) -> Self {
        self.findings.insert(project.uuid, findings);
        self.violations.insert(project.uuid, violations);
        self.projects.push(project);
        self
    }

    pub fn failing_findings_for(mut self, project: ProjectId) -> Self {
        self.failing_findings.insert(project);
        self
    }

    /// Reject writes addressed to this component.
    pub fn failing_writes_for(mut self, component: ComponentId) -> Self {
        self.failing_writes.insert(component.to_uuid());
        self
    }

    /// Finding fetches never complete.
    pub fn blocking_findings(mut self) -> Self {
        self.block_findings = true;
        self
    }

    /// The first finding fetch waits for `release_findings`.
    pub fn gate_first_findings(self) -> Self {
        self.gate_findings.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    async fn write(&self, write: Write, component: ComponentId) -> Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.writes.lock().unwrap().push(write);
        self.in_flight.store(false, Ordering::SeqCst);

        if self.failing_writes.contains(component.as_uuid()) {
            return Err(AuditError::Status {
                method: "PUT",
                url: "http://dtrack.test/api/v1/analysis".into(),
                status: 500,
                body: "write rejected".into(),
            });
        }
        Ok(())
    }
}

fn page_of<T: Clone>(items: &[T], page: PageOptions) -> Page<T> {
    let start = (page.page_number - 1) * page.page_size;
    let batch = items
        .iter()
        .skip(start)
        .take(page.page_size)
        .cloned()
        .collect();
    Page::new(batch, items.len())
}

#[async_trait]
impl PortfolioClient for InMemoryPortfolio {
    async fn projects(&self, page: PageOptions) -> Result<Page<Project>> {
        Ok(page_of(&self.projects, page))
    }

    async fn findings(&self, project: ProjectId, page: PageOptions) -> Result<Page<FindingRecord>> {
        self.finding_fetches.lock().unwrap().push(project);
        if self.block_findings {
            self.fetch_started.notify_one();
            std::future::pending::<()>().await;
        }
        if self.gate_findings.swap(false, Ordering::SeqCst) {
            self.fetch_started.notify_one();
            self.release_findings.notified().await;
        }
        if self.failing_findings.contains(&project) {
            return Err(AuditError::Status {
                method: "GET",
                url: format!("http://dtrack.test/api/v1/finding/project/{project}"),
                status: 503,
                body: "unavailable".into(),
            });
        }
        let items = self.findings.get(&project).cloned().unwrap_or_default();
        Ok(page_of(&items, page))
    }

    async fn violations(
        &self,
        project: ProjectId,
        page: PageOptions,
    ) -> Result<Page<PolicyViolation>> {
        self.violation_fetches.lock().unwrap().push(project);
        let items = self.violations.get(&project).cloned().unwrap_or_default();
        Ok(page_of(&items, page))
    }

    async fn submit_finding_analysis(&self, request: &FindingAnalysisRequest) -> Result<()> {
        self.write(Write::Finding(request.clone()), request.component)
            .await
    }

    async fn submit_violation_analysis(&self, request: &ViolationAnalysisRequest) -> Result<()> {
        self.write(Write::Violation(request.clone()), request.component)
            .await
    }
}

/// One captured log event: level, message and formatted fields.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub message: String,
    pub fields: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.message == message)
            .collect()
    }
}

struct CaptureLayer(CapturedLogs);

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
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
