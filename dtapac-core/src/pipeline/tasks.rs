use std::{fmt, future::Future};

use futures::{FutureExt, StreamExt, future::BoxFuture, stream::FuturesUnordered};
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{AuditError, Result};

/// A task-level error that brought the group down.
#[derive(Debug, Error)]
#[error("task `{task}` failed: {error}")]
pub struct TaskFailure {
    pub task: &'static str,
    #[source]
    pub error: AuditError,
}

type Joined = (&'static str, std::result::Result<Result<()>, JoinError>);

/// Named tasks sharing one cancellation token.
///
/// The first task to fail is recorded and cancels the token; later failures
/// are logged only. Cancellation errors raised after the token fired are
/// treated as a clean exit.
pub struct TaskGroup {
    token: CancellationToken,
    tasks: FuturesUnordered<BoxFuture<'static, Joined>>,
    failure: Option<TaskFailure>,
}

impl fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("running", &self.tasks.len())
            .field("cancelled", &self.token.is_cancelled())
            .field("failure", &self.failure.as_ref().map(|failure| failure.task))
            .finish()
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl TaskGroup {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            tasks: FuturesUnordered::new(),
            failure: None,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        debug!(task = name, "spawning task");
        let handle = tokio::spawn(task);
        self.tasks
            .push(async move { (name, handle.await) }.boxed());
    }

    /// Resolve once a task fails, returning its name. Resolves with `None`
    /// once every task has ended cleanly; pends forever if the group is empty.
    pub async fn first_failure(&mut self) -> Option<&'static str> {
        if self.tasks.is_empty() {
            return std::future::pending().await;
        }
        while let Some(joined) = self.tasks.next().await {
            if self.record(joined) {
                return self.failure.as_ref().map(|failure| failure.task);
            }
        }
        None
    }

    /// Wait for every remaining task and report the first failure, if any.
    pub async fn wait(mut self) -> std::result::Result<(), TaskFailure> {
        while let Some(joined) = self.tasks.next().await {
            self.record(joined);
        }
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Returns true when this result is the group's first failure.
    fn record(&mut self, (task, joined): Joined) -> bool {
        let error = match joined {
            Ok(Ok(())) => {
                debug!(task, "task finished");
                return false;
            }
            Ok(Err(err)) if err.is_cancelled() && self.token.is_cancelled() => {
                debug!(task, error = %err, "task cancelled");
                return false;
            }
            Ok(Err(err)) => err,
            Err(join_err) if join_err.is_cancelled() => {
                debug!(task, "task aborted");
                return false;
            }
            Err(join_err) => AuditError::Internal(format!("task panicked: {join_err}")),
        };

        error!(task, error = %error, "task failed");
        if self.failure.is_some() {
            return false;
        }
        self.failure = Some(TaskFailure { task, error });
        self.token.cancel();
        true
    }
}

/// Run `work` unless `token` fires first, in which case the result is
/// [`AuditError::Cancelled`] naming `what`.
pub async fn cancellable<T, F>(token: &CancellationToken, what: &str, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AuditError::Cancelled(what.to_string())),
        result = work => result,
    }
}
