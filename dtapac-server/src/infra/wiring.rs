use std::sync::Arc;

use anyhow::Context;
use dtapac_config::Config;
use dtapac_core::{
    AuditOrchestrator, Auditors, BundleWatcher, DecisionClient, DependencyTrackClient, OpaClient,
    PortfolioAnalysis, PortfolioClient, PortfolioScanner, Submitter, TriggerDebouncer,
    service_span,
};
use tracing::info;

use crate::api::ApiServer;

/// Upstream clients shared by every component.
#[derive(Clone)]
pub struct ServiceClients {
    pub decisions: Arc<dyn DecisionClient>,
    pub portfolio: Arc<dyn PortfolioClient>,
}

impl std::fmt::Debug for ServiceClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClients").finish_non_exhaustive()
    }
}

pub fn build_clients(config: &Config) -> anyhow::Result<ServiceClients> {
    let timeout = config.http.timeout;
    let opa = OpaClient::new(config.opa.url.as_str(), timeout)
        .context("failed to build OPA client")?;
    let dtrack = DependencyTrackClient::new(
        config.dtrack.url.as_str(),
        config.dtrack.api_key.clone(),
        timeout,
    )
    .context("failed to build Dependency-Track client")?;

    Ok(ServiceClients {
        decisions: Arc::new(opa),
        portfolio: Arc::new(dtrack),
    })
}

/// Assemble the receiver, the optional bundle-driven analysis chain and the
/// submitter around the given clients.
pub fn build_orchestrator(
    config: &Config,
    clients: ServiceClients,
) -> anyhow::Result<AuditOrchestrator> {
    let ServiceClients {
        decisions,
        portfolio,
    } = clients;

    let auditors = Auditors::from_policy_paths(
        decisions,
        config.audit.finding_policy_path.as_deref(),
        config.audit.violation_policy_path.as_deref(),
    )
    .context("no auditing configured")?;
    if let Some(auditor) = auditors.findings() {
        info!(policy = auditor.policy_path(), "finding analysis enabled");
    }
    if let Some(auditor) = auditors.violations() {
        info!(policy = auditor.policy_path(), "violation analysis enabled");
    }

    let api = ApiServer::new(
        config.server.bind_address(),
        auditors.clone(),
        service_span("api"),
    );
    let statuses = api.opa_status();

    let orchestrator = AuditOrchestrator::new(
        api.into_live_source(),
        Submitter::new(Arc::clone(&portfolio), service_span("submitter")),
        service_span("orchestrator"),
    );

    let Some(bundle) = config.audit.watch_bundle.clone() else {
        return Ok(orchestrator);
    };
    info!(bundle = %bundle, "portfolio analysis enabled");
    Ok(orchestrator.with_portfolio_analysis(PortfolioAnalysis {
        watcher: BundleWatcher::new(bundle.clone(), statuses, service_span("bundle-watcher")),
        debouncer: TriggerDebouncer::new(bundle, service_span("trigger")),
        scanner: PortfolioScanner::new(portfolio, auditors, service_span("portfolio-scanner")),
    }))
}
