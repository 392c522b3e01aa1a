//! Execution context handed to probers.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Deadline plus cancellation for one probe.
///
/// The context is done when the deadline passes or when the orchestrator
/// cancels it, whichever comes first. Probers should race their I/O against
/// [`ProbeContext::done`] or wrap it in [`ProbeContext::run`].
#[derive(Debug, Clone)]
pub struct ProbeContext {
    deadline: Instant,
    token: CancellationToken,
}

impl ProbeContext {
    /// Context that expires `budget` from now. A zero budget is already expired.
    pub fn new(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
            token: CancellationToken::new(),
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Resolves once the context is cancelled or the deadline passes.
    pub async fn done(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    /// Drive `fut` until it completes or the context is done.
    ///
    /// Returns `None` if the context finished first. The future is dropped at
    /// its next await point; work that never yields cannot be interrupted.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            out = fut => Some(out),
            _ = self.done() => None,
        }
    }

    /// Cancel the context when the returned guard is dropped.
    pub(crate) fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
