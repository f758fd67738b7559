//! Policy bundle revision watching.
//!
//! The policy engine pushes status reports to the receiver; the receiver
//! republishes them on a broadcast channel. [`BundleWatcher`] follows one
//! bundle through those reports and announces each new active revision.

use std::fmt;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use crate::error::Result;
use crate::model::OpaStatus;

const REVISION_BUFFER: usize = 16;

pub struct BundleWatcher {
    bundle: String,
    statuses: broadcast::Receiver<OpaStatus>,
    subscribers: Vec<mpsc::Sender<String>>,
    last_revision: Option<String>,
    span: Span,
}

impl fmt::Debug for BundleWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleWatcher")
            .field("bundle", &self.bundle)
            .field("subscribers", &self.subscribers.len())
            .field("last_revision", &self.last_revision)
            .finish_non_exhaustive()
    }
}

impl BundleWatcher {
    pub fn new(bundle: impl Into<String>, statuses: broadcast::Receiver<OpaStatus>, span: Span) -> Self {
        Self {
            bundle: bundle.into(),
            statuses,
            subscribers: Vec::new(),
            last_revision: None,
            span,
        }
    }

    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    /// Register for revision changes. Must be called before [`run`](Self::run).
    pub fn subscribe(&mut self) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(REVISION_BUFFER);
        self.subscribers.push(tx);
        rx
    }

    /// Follow status reports until the source closes or `cancel` fires.
    ///
    /// Every revision change is forwarded, including the first one observed.
    /// Subscriber channels close when this returns.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let span = self.span.clone();
        async move {
            loop {
                let status = tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("bundle watcher cancelled");
                        break;
                    }
                    received = self.statuses.recv() => received,
                };

                match status {
                    Ok(status) => {
                        if !self.observe(&status, &cancel).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "bundle watcher lagged behind status reports");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("status source closed");
                        break;
                    }
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Returns false once nobody is listening any more or on cancellation.
    async fn observe(&mut self, status: &OpaStatus, cancel: &CancellationToken) -> bool {
        let Some(revision) = status.bundle_revision(&self.bundle) else {
            return true;
        };
        if self.last_revision.as_deref() == Some(revision) {
            return true;
        }

        info!(
            bundle = %self.bundle,
            previous = self.last_revision.as_deref().unwrap_or("<none>"),
            revision,
            "bundle revision changed"
        );
        let revision = revision.to_string();
        self.last_revision = Some(revision.clone());

        let mut open = Vec::with_capacity(self.subscribers.len());
        for subscriber in self.subscribers.drain(..) {
            let sent = tokio::select! {
                _ = cancel.cancelled() => return false,
                sent = subscriber.send(revision.clone()) => sent,
            };
            if sent.is_ok() {
                open.push(subscriber);
            }
        }
        self.subscribers = open;
        !self.subscribers.is_empty()
    }
}
