//! Shutdown coordination for the exporter.

use std::future::Future;

use tokio::sync::broadcast;

use crate::lifecycle::signals;

/// Fan-out of the single "stop now" event.
///
/// The HTTP server, the reload controller and the SIGHUP listener each
/// subscribe; SIGINT/SIGTERM (or a test) fires it once.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the shutdown event.
    pub fn trigger(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(notified, "Shutdown triggered");
    }

    /// Future that resolves once shutdown fires, for `with_graceful_shutdown`.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Wait for SIGINT/SIGTERM, then fire.
    pub async fn on_termination(self) {
        signals::termination().await;
        self.trigger();
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
