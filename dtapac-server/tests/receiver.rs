use std::sync::atomic::Ordering;

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use dtapac_core::AuditError;
use dtapac_core::model::{AnalysisState, AuditResult, OpaStatus, ViolationAnalysisState};
use dtapac_server::api::{AppState, router};
use serde_json::{Value, json};

mod support;
use support::*;

fn test_server(state: AppState) -> Result<TestServer> {
    TestServer::new(router(state)).map_err(|err| anyhow::anyhow!(err.to_string()))
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(None));
    let (state, _rx) = AppState::new(auditors(decisions));
    let server = test_server(state)?;

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn new_vulnerability_queues_one_result_per_affected_project() -> Result<()> {
    let decisions = FnDecisions::new(|path, input| {
        assert_eq!(path, "dtapac/finding/analysis");
        let project = input["project"]["name"].as_str().unwrap_or_default();
        Ok(Some(json!({
            "state": "NOT_AFFECTED",
            "justification": "CODE_NOT_REACHABLE",
            "comment": format!("not reachable from {project}"),
            "suppress": true,
        })))
    });
    let (state, mut rx) = AppState::new(auditors(decisions.clone()));
    let server = test_server(state)?;

    let component = component("acme-lib");
    let vulnerability = vulnerability("CVE-2024-1234");
    let projects = [project("checkout"), project("billing")];
    let body = new_vulnerability_body(&component, &vulnerability, &projects);

    let request = async { server.post("/api/v1/dtrack/notification").json(&body).await };
    let (response, results) = tokio::join!(request, take(&mut rx, 2));

    response.assert_status(StatusCode::ACCEPTED);
    let ack: Value = response.json();
    assert_eq!(ack["queued"], 2);
    assert_eq!(decisions.calls.load(Ordering::SeqCst), 2);

    assert_eq!(results.len(), 2);
    for (result, project) in results.iter().zip(projects.iter()) {
        let AuditResult::Finding(request) = result else {
            panic!("expected finding analysis, got {result:?}");
        };
        assert_eq!(request.project, project.uuid);
        assert_eq!(request.component, component.uuid);
        assert_eq!(request.vulnerability, vulnerability.uuid);
        assert_eq!(request.state, Some(AnalysisState::NotAffected));
        assert!(request.suppressed);
        assert_eq!(
            request.comment.as_deref(),
            Some(format!("not reachable from {}", project.name).as_str())
        );
    }
    Ok(())
}

#[tokio::test]
async fn policy_violation_queues_single_result() -> Result<()> {
    let decisions = FnDecisions::new(|path, _| {
        assert_eq!(path, "dtapac/violation/analysis");
        Ok(Some(json!({"state": "APPROVED", "comment": "license exception"})))
    });
    let (state, mut rx) = AppState::new(auditors(decisions));
    let server = test_server(state)?;

    let component = component("gpl-thing");
    let project = project("checkout");
    let violation = policy_violation();
    let body = policy_violation_body(&component, &project, &violation);

    let response = server.post("/api/v1/dtrack/notification").json(&body).await;
    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.json::<Value>()["queued"], 1);

    let Some(AuditResult::Violation(request)) = rx.recv().await else {
        panic!("expected a violation analysis");
    };
    assert_eq!(request.component, component.uuid);
    assert_eq!(request.policy_violation, violation.uuid);
    assert_eq!(request.state, Some(ViolationAnalysisState::Approved));
    assert_eq!(request.comment.as_deref(), Some("license exception"));
    assert!(!request.suppressed);
    Ok(())
}

#[tokio::test]
async fn empty_decision_queues_nothing() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(Some(json!({"comment": ""}))));
    let (state, mut rx) = AppState::new(auditors(decisions.clone()));
    let server = test_server(state)?;

    let body = new_vulnerability_body(
        &component("acme-lib"),
        &vulnerability("CVE-2024-1234"),
        &[project("checkout")],
    );
    let response = server.post("/api/v1/dtrack/notification").json(&body).await;

    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.json::<Value>()["queued"], 0);
    assert_eq!(decisions.calls.load(Ordering::SeqCst), 1);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn unrelated_groups_are_acknowledged_without_auditing() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(Some(json!({"suppress": true}))));
    let (state, mut rx) = AppState::new(auditors(decisions.clone()));
    let server = test_server(state)?;

    let body = json!({
        "notification": {
            "level": "INFORMATIONAL",
            "scope": "SYSTEM",
            "group": "BOM_CONSUMED",
            "title": "Bill of Materials Consumed",
            "subject": {"project": {"uuid": "b1d5e7a0-8b1e-4bde-8f0f-7e1f4bb6f3a2"}}
        }
    });
    let response = server.post("/api/v1/dtrack/notification").json(&body).await;

    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.json::<Value>()["queued"], 0);
    assert_eq!(decisions.calls.load(Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn disabled_category_is_acknowledged_without_auditing() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(Some(json!({"suppress": true}))));
    let auditors = dtapac_core::Auditors::from_policy_paths(
        decisions.clone(),
        Some(FINDING_POLICY),
        None,
    )?;
    let (state, mut rx) = AppState::new(auditors);
    let server = test_server(state)?;

    let body = policy_violation_body(
        &component("gpl-thing"),
        &project("checkout"),
        &policy_violation(),
    );
    let response = server.post("/api/v1/dtrack/notification").json(&body).await;

    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(response.json::<Value>()["queued"], 0);
    assert_eq!(decisions.calls.load(Ordering::SeqCst), 0);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn malformed_notification_is_rejected() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(None));
    let (state, _rx) = AppState::new(auditors(decisions.clone()));
    let server = test_server(state)?;

    let response = server
        .post("/api/v1/dtrack/notification")
        .json(&json!({"not_a_notification": true}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 400);

    let response = server
        .post("/api/v1/dtrack/notification")
        .json(&json!({
            "notification": {
                "group": "NEW_VULNERABILITY",
                "subject": {"component": {"name": "no-uuid"}}
            }
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(decisions.calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn decision_failure_is_reported_as_server_error() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| {
        Err(AuditError::Status {
            method: "POST",
            url: "http://opa.test/v1/data/dtapac/finding/analysis".into(),
            status: 500,
            body: "policy evaluation failed".into(),
        })
    });
    let (state, mut rx) = AppState::new(auditors(decisions));
    let server = test_server(state)?;

    let body = new_vulnerability_body(
        &component("acme-lib"),
        &vulnerability("CVE-2024-1234"),
        &[project("checkout")],
    );
    let response = server.post("/api/v1/dtrack/notification").json(&body).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let ack: Value = response.json();
    assert_eq!(ack["queued"], 0);
    assert_eq!(ack["failed"], 1);
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn failed_decision_skips_only_that_project() -> Result<()> {
    let decisions = FnDecisions::new(|_, input| {
        if input["project"]["name"] == "billing" {
            return Err(AuditError::Internal("policy evaluation failed".into()));
        }
        Ok(Some(json!({"state": "IN_TRIAGE"})))
    });
    let (state, mut rx) = AppState::new(auditors(decisions.clone()));
    let server = test_server(state)?;

    let projects = [project("checkout"), project("billing"), project("search")];
    let body = new_vulnerability_body(
        &component("acme-lib"),
        &vulnerability("CVE-2024-1234"),
        &projects,
    );
    let request = async { server.post("/api/v1/dtrack/notification").json(&body).await };
    let (response, results) = tokio::join!(request, take(&mut rx, 2));

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let ack: Value = response.json();
    assert_eq!(ack["queued"], 2);
    assert_eq!(ack["failed"], 1);
    assert_eq!(decisions.calls.load(Ordering::SeqCst), 3);

    let audited: Vec<_> = results
        .iter()
        .map(|result| match result {
            AuditResult::Finding(request) => request.project,
            other => panic!("expected finding analysis, got {other:?}"),
        })
        .collect();
    assert_eq!(audited, vec![projects[0].uuid, projects[2].uuid]);
    Ok(())
}

#[tokio::test]
async fn closed_pipeline_reports_unavailable() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(Some(json!({"suppress": true}))));
    let (state, rx) = AppState::new(auditors(decisions));
    drop(rx);
    let server = test_server(state)?;
    let (logs, _guard) = capture_logs();

    let component = component("acme-lib");
    let body = new_vulnerability_body(
        &component,
        &vulnerability("CVE-2024-1234"),
        &[project("checkout")],
    );
    let response = server.post("/api/v1/dtrack/notification").json(&body).await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let dropped = logs.with_message("dropping finding analysis");
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].fields["component"], component.uuid.to_string());
    assert_eq!(dropped[0].fields["reason"], "audit pipeline closed");
    Ok(())
}

#[tokio::test]
async fn opa_status_is_republished_to_subscribers() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(None));
    let (state, _rx) = AppState::new(auditors(decisions));
    let mut statuses = state.status_tx.subscribe();
    let server = test_server(state)?;

    let response = server
        .post("/api/v1/opa/status")
        .json(&json!({
            "labels": {"id": "opa-1"},
            "bundles": {"dtapac": {"name": "dtapac", "active_revision": "rev-7"}}
        }))
        .await;
    response.assert_status_ok();

    let status: OpaStatus = statuses.recv().await?;
    assert_eq!(status.bundle_revision("dtapac"), Some("rev-7"));
    Ok(())
}

#[tokio::test]
async fn opa_status_without_subscribers_is_accepted() -> Result<()> {
    let decisions = FnDecisions::new(|_, _| Ok(None));
    let (state, _rx) = AppState::new(auditors(decisions));
    let server = test_server(state)?;

    let response = server
        .post("/api/v1/opa/status")
        .json(&json!({"bundles": {}}))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/api/v1/opa/status")
        .json(&json!("not a status"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}
