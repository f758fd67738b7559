//! Webhook receiver.
//!
//! Dependency-Track posts notifications here; each affected subject is sent
//! through the configured auditors and actionable decisions are queued for
//! the submitter. OPA posts status reports here; they are republished for the
//! bundle watcher.

use std::fmt;

use axum::{
    Router,
    routing::{get, post},
};
use dtapac_core::{Auditors, LiveSource, model::AuditResult, model::OpaStatus};
use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Span, info};

pub mod errors;
pub mod handlers;

/// Buffer between request handlers and the submitter.
const AUDIT_RESULT_BUFFER: usize = 1;
/// Status reports retained for slow watchers.
const STATUS_BUFFER: usize = 16;

#[derive(Clone)]
pub struct AppState {
    pub auditors: Auditors,
    pub audit_tx: mpsc::Sender<AuditResult>,
    pub status_tx: broadcast::Sender<OpaStatus>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("auditors", &self.auditors)
            .field("status_subscribers", &self.status_tx.receiver_count())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State plus the receiving end of its audit channel.
    pub fn new(auditors: Auditors) -> (Self, mpsc::Receiver<AuditResult>) {
        let (audit_tx, audit_rx) = mpsc::channel(AUDIT_RESULT_BUFFER);
        let (status_tx, _) = broadcast::channel(STATUS_BUFFER);
        (
            Self {
                auditors,
                audit_tx,
                status_tx,
            },
            audit_rx,
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/dtrack/notification",
            post(handlers::handle_notification),
        )
        .route("/api/v1/opa/status", post(handlers::handle_opa_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The receiver as a process component: bound on start, stopped through its
/// stop handle.
pub struct ApiServer {
    addr: String,
    state: AppState,
    results: mpsc::Receiver<AuditResult>,
    stop: CancellationToken,
    span: Span,
}

impl fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiServer")
            .field("addr", &self.addr)
            .field("stopped", &self.stop.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ApiServer {
    pub fn new(addr: impl Into<String>, auditors: Auditors, span: Span) -> Self {
        let (state, results) = AppState::new(auditors);
        Self {
            addr: addr.into(),
            state,
            results,
            stop: CancellationToken::new(),
            span,
        }
    }

    /// Status reports received from the policy engine.
    pub fn opa_status(&self) -> broadcast::Receiver<OpaStatus> {
        self.state.status_tx.subscribe()
    }

    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Hand the receiver to the orchestrator. The audit result channel closes
    /// once the serve future has completed.
    pub fn into_live_source(self) -> LiveSource {
        let Self {
            addr,
            state,
            results,
            stop,
            span,
        } = self;
        LiveSource {
            results,
            serve: serve(addr, state, stop.clone()).instrument(span).boxed(),
            stop,
        }
    }
}

async fn serve(addr: String, state: AppState, stop: CancellationToken) -> dtapac_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "receiver listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { stop.cancelled().await })
        .await?;

    info!("receiver stopped");
    Ok(())
}
