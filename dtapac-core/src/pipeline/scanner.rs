use std::{fmt, sync::Arc};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use super::submitter::log_dropped_result;
use super::tasks::cancellable;
use super::trigger::TriggerSignal;
use crate::decision::Auditors;
use crate::error::{AuditError, Result};
use crate::model::{AuditResult, Finding, Project, Violation};
use crate::portfolio::{
    PortfolioClient, fetch_all_findings, fetch_all_projects, fetch_all_violations,
};

/// Counters for one completed pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub projects: usize,
    pub findings: usize,
    pub violations: usize,
    pub emitted: usize,
    pub skipped_fetches: usize,
    pub skipped_subjects: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassSummary),
    /// The project listing could not be fetched.
    Aborted,
    /// Cancelled, or nobody is consuming results any more.
    Interrupted,
}

struct Interrupted;

/// Re-audits the whole portfolio once per trigger signal.
///
/// Passes run strictly one after another. Within a pass, projects are walked
/// in fetch order and each project's findings are audited before its
/// violations. The scanner never writes to the portfolio; results go out on
/// the channel handed to [`run`](Self::run).
pub struct PortfolioScanner {
    portfolio: Arc<dyn PortfolioClient>,
    auditors: Auditors,
    span: Span,
}

impl fmt::Debug for PortfolioScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortfolioScanner")
            .field("auditors", &self.auditors)
            .finish_non_exhaustive()
    }
}

impl PortfolioScanner {
    pub fn new(portfolio: Arc<dyn PortfolioClient>, auditors: Auditors, span: Span) -> Self {
        Self {
            portfolio,
            auditors,
            span,
        }
    }

    /// Consume trigger signals until the trigger input closes or `cancel`
    /// fires. `results` is dropped on return, closing the output.
    pub async fn run(
        self,
        mut triggers: mpsc::Receiver<TriggerSignal>,
        results: mpsc::Sender<AuditResult>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let span = self.span.clone();
        async move {
            loop {
                let signal = tokio::select! {
                    _ = cancel.cancelled() => break,
                    signal = triggers.recv() => signal,
                };
                if signal.is_none() {
                    debug!("trigger input closed");
                    break;
                }

                info!("starting portfolio analysis");
                match self.scan(&results, &cancel).await {
                    PassOutcome::Completed(summary) => info!(
                        projects = summary.projects,
                        findings = summary.findings,
                        violations = summary.violations,
                        emitted = summary.emitted,
                        skipped_fetches = summary.skipped_fetches,
                        skipped_subjects = summary.skipped_subjects,
                        "portfolio analysis completed"
                    ),
                    PassOutcome::Aborted => warn!("portfolio analysis aborted"),
                    PassOutcome::Interrupted => {
                        info!("portfolio analysis interrupted");
                        break;
                    }
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Run a single pass over the whole portfolio.
    pub async fn scan(
        &self,
        results: &mpsc::Sender<AuditResult>,
        cancel: &CancellationToken,
    ) -> PassOutcome {
        let projects = match cancellable(
            cancel,
            "fetch projects",
            fetch_all_projects(self.portfolio.as_ref()),
        )
        .await
        {
            Ok(projects) => projects,
            Err(err) if err.is_cancelled() => {
                warn!(error = %err, "project fetch interrupted");
                return PassOutcome::Interrupted;
            }
            Err(err) => {
                error!(error = %err, "failed to fetch projects");
                return PassOutcome::Aborted;
            }
        };

        let mut summary = PassSummary {
            projects: projects.len(),
            ..PassSummary::default()
        };

        for project in &projects {
            if cancel.is_cancelled() {
                return PassOutcome::Interrupted;
            }
            let span = info_span!("project", project = %project.uuid, name = %project.name);
            let scanned = self
                .scan_project(project, results, cancel, &mut summary)
                .instrument(span)
                .await;
            if scanned.is_err() {
                return PassOutcome::Interrupted;
            }
        }

        PassOutcome::Completed(summary)
    }

    async fn scan_project(
        &self,
        project: &Project,
        results: &mpsc::Sender<AuditResult>,
        cancel: &CancellationToken,
        summary: &mut PassSummary,
    ) -> std::result::Result<(), Interrupted> {
        self.scan_findings(project, results, cancel, summary).await?;
        self.scan_violations(project, results, cancel, summary).await
    }

    async fn scan_findings(
        &self,
        project: &Project,
        results: &mpsc::Sender<AuditResult>,
        cancel: &CancellationToken,
        summary: &mut PassSummary,
    ) -> std::result::Result<(), Interrupted> {
        let Some(auditor) = self.auditors.findings() else {
            info!(project = %project.uuid, "finding analysis disabled; skipping findings");
            return Ok(());
        };

        let fetched = cancellable(
            cancel,
            "fetch findings",
            fetch_all_findings(self.portfolio.as_ref(), project.uuid),
        )
        .await;
        let records = match fetched {
            Ok(records) => records,
            Err(err) => {
                interrupted_by(&err)?;
                error!(project = %project.uuid, error = %err, "failed to fetch findings; skipping");
                summary.skipped_fetches += 1;
                return Ok(());
            }
        };

        for record in records {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }
            summary.findings += 1;
            let finding = Finding::new(record.component, project.clone(), record.vulnerability);

            let analysis = match cancellable(cancel, "audit finding", auditor.audit(&finding)).await {
                Ok(analysis) => analysis,
                Err(err) => {
                    interrupted_by(&err)?;
                    error!(
                        project = %finding.project.uuid,
                        component = %finding.component.uuid,
                        vulnerability = %finding.vulnerability.uuid,
                        vuln_id = %finding.vulnerability.vuln_id,
                        error = %err,
                        "failed to audit finding"
                    );
                    summary.skipped_subjects += 1;
                    continue;
                }
            };

            if let Some(result) = AuditResult::for_finding(&finding, analysis) {
                emit(result, results, cancel).await?;
                summary.emitted += 1;
            }
        }

        Ok(())
    }

    async fn scan_violations(
        &self,
        project: &Project,
        results: &mpsc::Sender<AuditResult>,
        cancel: &CancellationToken,
        summary: &mut PassSummary,
    ) -> std::result::Result<(), Interrupted> {
        let Some(auditor) = self.auditors.violations() else {
            info!(project = %project.uuid, "violation analysis disabled; skipping violations");
            return Ok(());
        };

        let fetched = cancellable(
            cancel,
            "fetch violations",
            fetch_all_violations(self.portfolio.as_ref(), project.uuid),
        )
        .await;
        let listing = match fetched {
            Ok(listing) => listing,
            Err(err) => {
                interrupted_by(&err)?;
                error!(project = %project.uuid, error = %err, "failed to fetch policy violations; skipping");
                summary.skipped_fetches += 1;
                return Ok(());
            }
        };

        for policy_violation in listing {
            if cancel.is_cancelled() {
                return Err(Interrupted);
            }
            summary.violations += 1;
            let violation_id = policy_violation.uuid;
            let Some(violation) = Violation::from_listing(project, policy_violation) else {
                warn!(
                    project = %project.uuid,
                    policy_violation = %violation_id,
                    "policy violation has no component; skipping"
                );
                summary.skipped_subjects += 1;
                continue;
            };

            let analysis =
                match cancellable(cancel, "audit violation", auditor.audit(&violation)).await {
                    Ok(analysis) => analysis,
                    Err(err) => {
                        interrupted_by(&err)?;
                        error!(
                            project = %violation.project.uuid,
                            component = %violation.component.uuid,
                            policy_violation = %violation.policy_violation.uuid,
                            error = %err,
                            "failed to audit policy violation"
                        );
                        summary.skipped_subjects += 1;
                        continue;
                    }
                };

            if let Some(result) = AuditResult::for_violation(&violation, analysis) {
                emit(result, results, cancel).await?;
                summary.emitted += 1;
            }
        }

        Ok(())
    }
}

fn interrupted_by(err: &AuditError) -> std::result::Result<(), Interrupted> {
    if err.is_cancelled() {
        warn!(error = %err, "portfolio call interrupted");
        return Err(Interrupted);
    }
    Ok(())
}

async fn emit(
    result: AuditResult,
    results: &mpsc::Sender<AuditResult>,
    cancel: &CancellationToken,
) -> std::result::Result<(), Interrupted> {
    tokio::select! {
        _ = cancel.cancelled() => {
            log_dropped_result(&result, "shutdown");
            Err(Interrupted)
        }
        permit = results.reserve() => match permit {
            Ok(permit) => {
                permit.send(result);
                Ok(())
            }
            Err(_) => {
                warn!("audit result consumer is gone");
                log_dropped_result(&result, "consumer closed");
                Err(Interrupted)
            }
        },
    }
}
