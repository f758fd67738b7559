use std::{fmt, future::Future};

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, error, info};

use super::merge::merge;
use super::scanner::PortfolioScanner;
use super::submitter::Submitter;
use super::tasks::{TaskFailure, TaskGroup};
use super::trigger::{TriggerDebouncer, trigger_channel};
use crate::error::Result;
use crate::model::AuditResult;
use crate::watch::BundleWatcher;

/// Scanner results buffer. One slot keeps the scanner at most one result
/// ahead of the submitter.
const SCAN_RESULT_BUFFER: usize = 1;

/// The live receiver as seen by the orchestrator.
///
/// `serve` runs the receiver until `stop` is cancelled and fails if the
/// receiver cannot start. `results` closes once the receiver has stopped.
pub struct LiveSource {
    pub results: mpsc::Receiver<AuditResult>,
    pub serve: BoxFuture<'static, Result<()>>,
    pub stop: CancellationToken,
}

impl fmt::Debug for LiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSource")
            .field("stopped", &self.stop.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Components needed for bundle-driven portfolio re-analysis.
#[derive(Debug)]
pub struct PortfolioAnalysis {
    pub watcher: BundleWatcher,
    pub debouncer: TriggerDebouncer,
    pub scanner: PortfolioScanner,
}

/// Supervises the receiver, the optional portfolio analysis chain, and the
/// submitter as one task group.
#[derive(Debug)]
pub struct AuditOrchestrator {
    live: LiveSource,
    analysis: Option<PortfolioAnalysis>,
    submitter: Submitter,
    span: Span,
}

impl AuditOrchestrator {
    pub fn new(live: LiveSource, submitter: Submitter, span: Span) -> Self {
        Self {
            live,
            analysis: None,
            submitter,
            span,
        }
    }

    pub fn with_portfolio_analysis(mut self, analysis: PortfolioAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn has_portfolio_analysis(&self) -> bool {
        self.analysis.is_some()
    }

    /// Run until `shutdown` resolves or a task fails, then stop the receiver,
    /// cancel every task and wait for all of them.
    pub async fn run<F>(self, shutdown: F) -> std::result::Result<(), TaskFailure>
    where
        F: Future<Output = ()>,
    {
        let Self {
            live,
            analysis,
            submitter,
            span,
        } = self;

        async move {
            let token = CancellationToken::new();
            let mut group = TaskGroup::new(token.clone());

            let LiveSource {
                results: live_results,
                serve,
                stop,
            } = live;
            group.spawn("receiver", serve);
            let mut sources = vec![ReceiverStream::new(live_results)];

            if let Some(PortfolioAnalysis {
                mut watcher,
                debouncer,
                scanner,
            }) = analysis
            {
                let revisions = watcher.subscribe();
                let (trigger_tx, trigger_rx) = trigger_channel();
                let (scan_tx, scan_rx) = mpsc::channel(SCAN_RESULT_BUFFER);

                group.spawn("bundle-watcher", watcher.run(token.clone()));
                let debounce_token = token.clone();
                group.spawn("trigger-debouncer", async move {
                    debouncer
                        .run(ReceiverStream::new(revisions), trigger_tx, debounce_token)
                        .await;
                    Ok(())
                });
                group.spawn(
                    "portfolio-scanner",
                    scanner.run(trigger_rx, scan_tx, token.clone()),
                );
                sources.push(ReceiverStream::new(scan_rx));
            } else {
                info!("no bundle to watch; portfolio analysis disabled");
            }

            let merged = merge(sources);
            let submit_token = token.clone();
            group.spawn("submitter", async move {
                submitter.run(merged, submit_token).await.map(|_| ())
            });

            tokio::pin!(shutdown);
            tokio::select! {
                _ = &mut shutdown => info!("shutdown requested"),
                failed = group.first_failure() => match failed {
                    Some(task) => error!(task, "task failed; shutting down"),
                    None => info!("all tasks finished"),
                },
            }

            stop.cancel();
            token.cancel();
            let outcome = group.wait().await;
            info!("all tasks stopped");
            outcome
        }
        .instrument(span)
        .await
    }
}
