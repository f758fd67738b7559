use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use dtapac_core::log_dropped_result;
use dtapac_core::model::{
    AuditResult, Finding, NewVulnerabilitySubject, Notification, NotificationEnvelope,
    NotificationGroup, OpaStatus, PolicyViolationSubject, Violation,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::AppState;
use super::errors::{AppError, AppResult};

#[derive(Debug, Default, Serialize)]
pub struct NotificationAck {
    pub queued: usize,
    pub failed: usize,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Audit every subject of a portfolio notification. A subject whose decision
/// fails is skipped; the others are still audited and queued. Any failure
/// turns the reply into a 500 carrying both counts.
pub async fn handle_notification(
    State(state): State<AppState>,
    payload: Result<Json<NotificationEnvelope>, JsonRejection>,
) -> AppResult<(StatusCode, Json<NotificationAck>)> {
    let Json(NotificationEnvelope { notification }) = payload.map_err(|rejection| {
        warn!(error = %rejection, "rejected malformed notification");
        AppError::bad_request(rejection.body_text())
    })?;

    let ack = match notification.group {
        NotificationGroup::NewVulnerability => new_vulnerability(&state, notification).await?,
        NotificationGroup::PolicyViolation => policy_violation(&state, notification).await?,
        NotificationGroup::Other => {
            debug!(title = ?notification.title, "ignoring notification group");
            NotificationAck::default()
        }
    };

    let status = if ack.failed > 0 {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(ack)))
}

async fn new_vulnerability(
    state: &AppState,
    notification: Notification,
) -> AppResult<NotificationAck> {
    let Some(auditor) = state.auditors.findings() else {
        info!("finding analysis disabled; ignoring NEW_VULNERABILITY notification");
        return Ok(NotificationAck::default());
    };

    let subject: NewVulnerabilitySubject = serde_json::from_value(notification.subject)
        .map_err(|err| AppError::bad_request(format!("invalid NEW_VULNERABILITY subject: {err}")))?;
    let NewVulnerabilitySubject {
        component,
        vulnerability,
        affected_projects,
    } = subject;

    let mut ack = NotificationAck::default();
    for project in affected_projects {
        let finding = Finding::new(component.clone(), project, vulnerability.clone());
        let analysis = match auditor.audit(&finding).await {
            Ok(analysis) => analysis,
            Err(err) => {
                error!(
                    project = %finding.project.uuid,
                    component = %finding.component.uuid,
                    vulnerability = %finding.vulnerability.uuid,
                    error = %err,
                    "failed to audit finding"
                );
                ack.failed += 1;
                continue;
            }
        };

        if let Some(result) = AuditResult::for_finding(&finding, analysis) {
            enqueue(state, result).await?;
            ack.queued += 1;
        }
    }

    Ok(ack)
}

async fn policy_violation(
    state: &AppState,
    notification: Notification,
) -> AppResult<NotificationAck> {
    let Some(auditor) = state.auditors.violations() else {
        info!("violation analysis disabled; ignoring POLICY_VIOLATION notification");
        return Ok(NotificationAck::default());
    };

    let subject: PolicyViolationSubject = serde_json::from_value(notification.subject)
        .map_err(|err| AppError::bad_request(format!("invalid POLICY_VIOLATION subject: {err}")))?;
    let violation = Violation::new(subject.component, subject.project, subject.policy_violation);

    let mut ack = NotificationAck::default();
    match auditor.audit(&violation).await {
        Ok(analysis) => {
            if let Some(result) = AuditResult::for_violation(&violation, analysis) {
                enqueue(state, result).await?;
                ack.queued += 1;
            }
        }
        Err(err) => {
            error!(
                project = %violation.project.uuid,
                component = %violation.component.uuid,
                policy_violation = %violation.policy_violation.uuid,
                error = %err,
                "failed to audit policy violation"
            );
            ack.failed += 1;
        }
    }

    Ok(ack)
}

async fn enqueue(state: &AppState, result: AuditResult) -> AppResult<()> {
    state.audit_tx.send(result).await.map_err(|err| {
        log_dropped_result(&err.0, "audit pipeline closed");
        AppError::unavailable("audit pipeline is shutting down")
    })
}

pub async fn handle_opa_status(
    State(state): State<AppState>,
    payload: Result<Json<OpaStatus>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(status) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let bundles = status.bundles.len();
    if state.status_tx.send(status).is_err() {
        debug!(bundles, "status report received with no watcher subscribed");
    }
    Ok(StatusCode::OK)
}
