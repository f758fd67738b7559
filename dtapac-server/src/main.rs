//! # dtapac
//!
//! Audits Dependency-Track findings and policy violations with Open Policy
//! Agent.
//!
//! Webhook notifications are audited as they arrive. When a policy bundle is
//! watched, every change of its active revision re-audits the whole portfolio.

use anyhow::Context;
use clap::Parser;
use dtapac_config::{ConfigArgs, ConfigLoad};
use dtapac_server::infra::{build_clients, build_orchestrator, shutdown_signal};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "dtapac", version)]
#[command(about = "Audit Dependency-Track findings and policy violations using Open Policy Agent")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ConfigLoad { config, warnings } = cli
        .config
        .loader()
        .load()
        .context("failed to load configuration")?;

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "loaded configuration file");
    }
    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => warn!(message = %warning.message, hint = %hint, "configuration warning"),
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    let clients = build_clients(&config)?;
    let orchestrator = build_orchestrator(&config, clients)?;

    info!(
        addr = %config.server.bind_address(),
        dtrack = %config.dtrack.url,
        opa = %config.opa.url,
        "starting dtapac"
    );

    if let Err(failure) = orchestrator.run(shutdown_signal()).await {
        error!(task = failure.task, error = %failure.error, "shutting down after task failure");
        return Err(failure).context("audit pipeline failed");
    }

    info!("shutdown complete");
    Ok(())
}
