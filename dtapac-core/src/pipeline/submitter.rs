use std::{fmt, sync::Arc};

use futures::{FutureExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, warn};

use super::tasks::cancellable;
use crate::error::Result;
use crate::model::AuditResult;
use crate::portfolio::PortfolioClient;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionStats {
    pub submitted: usize,
    pub failed: usize,
    /// Results still buffered when the submitter was cancelled.
    pub dropped: usize,
}

/// Log a result that will never reach the portfolio, with every field of the
/// request it carried.
pub fn log_dropped_result(result: &AuditResult, reason: &str) {
    match result {
        AuditResult::Finding(request) => warn!(
            project = %request.project,
            component = %request.component,
            vulnerability = %request.vulnerability,
            state = ?request.state,
            justification = ?request.justification,
            response = ?request.response,
            comment = request.comment.as_deref().unwrap_or_default(),
            suppressed = request.suppressed,
            reason,
            "dropping finding analysis"
        ),
        AuditResult::Violation(request) => warn!(
            component = %request.component,
            policy_violation = %request.policy_violation,
            state = ?request.state,
            comment = request.comment.as_deref().unwrap_or_default(),
            suppressed = request.suppressed,
            reason,
            "dropping violation analysis"
        ),
    }
}

/// The only writer of analysis data to the portfolio.
///
/// Results are taken one at a time and each write completes before the next
/// result is pulled from the stream.
pub struct Submitter {
    portfolio: Arc<dyn PortfolioClient>,
    span: Span,
}

impl fmt::Debug for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter").finish_non_exhaustive()
    }
}

impl Submitter {
    pub fn new(portfolio: Arc<dyn PortfolioClient>, span: Span) -> Self {
        Self { portfolio, span }
    }

    /// Drain `results` until it ends or `cancel` fires. On cancellation the
    /// results that are already buffered are logged, not written.
    pub async fn run<S>(self, mut results: S, cancel: CancellationToken) -> Result<SubmissionStats>
    where
        S: Stream<Item = AuditResult> + Unpin,
    {
        let span = self.span.clone();
        async move {
            let mut stats = SubmissionStats::default();
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("submitter cancelled");
                        while let Some(Some(result)) = results.next().now_or_never() {
                            log_dropped_result(&result, "shutdown");
                            stats.dropped += 1;
                        }
                        break;
                    }
                    next = results.next() => next,
                };
                let Some(result) = next else {
                    debug!("audit result stream ended");
                    break;
                };

                if self.submit(&result, &cancel).await {
                    stats.submitted += 1;
                } else {
                    stats.failed += 1;
                }
            }
            info!(
                submitted = stats.submitted,
                failed = stats.failed,
                dropped = stats.dropped,
                "submitter stopped"
            );
            Ok(stats)
        }
        .instrument(span)
        .await
    }

    /// Write one result. Failures are logged with the full request and
    /// reported as `false`; nothing is retried.
    pub async fn submit(&self, result: &AuditResult, cancel: &CancellationToken) -> bool {
        match result {
            AuditResult::Finding(request) => {
                let written = cancellable(
                    cancel,
                    "submit finding analysis",
                    self.portfolio.submit_finding_analysis(request),
                )
                .await;
                match written {
                    Ok(()) => {
                        info!(
                            project = %request.project,
                            component = %request.component,
                            vulnerability = %request.vulnerability,
                            state = ?request.state,
                            suppressed = request.suppressed,
                            "submitted finding analysis"
                        );
                        true
                    }
                    Err(err) => {
                        error!(
                            project = %request.project,
                            component = %request.component,
                            vulnerability = %request.vulnerability,
                            state = ?request.state,
                            justification = ?request.justification,
                            response = ?request.response,
                            comment = request.comment.as_deref().unwrap_or_default(),
                            suppressed = request.suppressed,
                            error = %err,
                            "failed to submit finding analysis"
                        );
                        false
                    }
                }
            }
            AuditResult::Violation(request) => {
                let written = cancellable(
                    cancel,
                    "submit violation analysis",
                    self.portfolio.submit_violation_analysis(request),
                )
                .await;
                match written {
                    Ok(()) => {
                        info!(
                            component = %request.component,
                            policy_violation = %request.policy_violation,
                            state = ?request.state,
                            suppressed = request.suppressed,
                            "submitted violation analysis"
                        );
                        true
                    }
                    Err(err) => {
                        error!(
                            component = %request.component,
                            policy_violation = %request.policy_violation,
                            state = ?request.state,
                            comment = request.comment.as_deref().unwrap_or_default(),
                            suppressed = request.suppressed,
                            error = %err,
                            "failed to submit violation analysis"
                        );
                        false
                    }
                }
            }
        }
    }
}
