use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info};

/// Request for one portfolio re-analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerSignal;

/// Single-slot trigger buffer: at most one pending signal.
pub fn trigger_channel() -> (mpsc::Sender<TriggerSignal>, mpsc::Receiver<TriggerSignal>) {
    mpsc::channel(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOffer {
    Queued,
    /// A signal was already pending; this one was dropped.
    Coalesced,
    Closed,
}

impl TriggerOffer {
    /// Non-blocking send with drop-on-full.
    pub fn offer(tx: &mpsc::Sender<TriggerSignal>) -> Self {
        match tx.try_send(TriggerSignal) {
            Ok(()) => TriggerOffer::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => TriggerOffer::Coalesced,
            Err(mpsc::error::TrySendError::Closed(_)) => TriggerOffer::Closed,
        }
    }
}

/// Collapses bursts of bundle revision changes into pending scan signals.
#[derive(Debug)]
pub struct TriggerDebouncer {
    bundle: String,
    span: Span,
}

impl TriggerDebouncer {
    pub fn new(bundle: impl Into<String>, span: Span) -> Self {
        Self {
            bundle: bundle.into(),
            span,
        }
    }

    /// Forward revisions as trigger signals until the input ends, the
    /// receiving side goes away, or `cancel` fires. Dropping `triggers` on
    /// return closes the output.
    pub async fn run<S>(self, mut revisions: S, triggers: mpsc::Sender<TriggerSignal>, cancel: CancellationToken)
    where
        S: Stream<Item = String> + Unpin,
    {
        let bundle = self.bundle;
        async move {
            loop {
                let revision = tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = revisions.next() => match next {
                        Some(revision) => revision,
                        None => break,
                    },
                };

                info!(bundle = %bundle, revision = %revision, "bundle updated");
                match TriggerOffer::offer(&triggers) {
                    TriggerOffer::Queued => debug!("portfolio analysis scheduled"),
                    TriggerOffer::Coalesced => {
                        debug!("portfolio analysis already pending; dropping trigger")
                    }
                    TriggerOffer::Closed => break,
                }
            }
            debug!("trigger debouncer stopped");
        }
        .instrument(self.span)
        .await
    }
}
