//! Serialized configuration reloads.
//!
//! Every trigger (SIGHUP, `POST /-/reload`, file watcher) becomes a message
//! on one queue. A single task drains the queue and runs one reload attempt
//! per message, so attempts never overlap and each one sees the store as the
//! previous attempt left it.

use std::path::{Path, PathBuf};

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::loader::{load_config, ConfigError};
use crate::config::store::SafeConfig;
use crate::observability::metrics;

/// Why a requested reload did not take effect.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reload controller is not running")]
    Stopped,
}

/// A queued reload attempt. `reply` is set when the caller waits for the outcome.
#[derive(Debug)]
struct ReloadRequest {
    reply: Option<oneshot::Sender<Result<(), ReloadError>>>,
}

/// Cloneable sender side of the reload queue.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    tx: mpsc::UnboundedSender<ReloadRequest>,
}

impl ReloadHandle {
    /// Queue a reload without waiting for it.
    pub fn trigger(&self) {
        if self.tx.send(ReloadRequest { reply: None }).is_err() {
            tracing::warn!("Reload requested after controller stopped");
        }
    }

    /// Queue a reload and wait for its outcome.
    pub async fn reload(&self) -> Result<(), ReloadError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(ReloadRequest { reply: Some(reply) })
            .map_err(|_| ReloadError::Stopped)?;
        outcome.await.map_err(|_| ReloadError::Stopped)?
    }
}

/// Load `path` and publish it into `store`, leaving the store untouched on error.
pub fn reload_into(path: &Path, store: &SafeConfig) -> Result<(), ConfigError> {
    let config = load_config(path)?;
    let modules = config.modules.len();
    store.replace(config);
    tracing::info!(path = %path.display(), modules, "Loaded config file");
    Ok(())
}

/// The only writer of the shared configuration after startup.
pub struct ReloadController {
    path: PathBuf,
    store: SafeConfig,
    rx: mpsc::UnboundedReceiver<ReloadRequest>,
}

impl ReloadController {
    pub fn new(path: impl Into<PathBuf>, store: SafeConfig) -> (Self, ReloadHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.into(),
                store,
                rx,
            },
            ReloadHandle { tx },
        )
    }

    /// Process reload requests one at a time until shutdown or until every
    /// handle is dropped.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(path = %self.path.display(), "Reload controller started");

        loop {
            tokio::select! {
                request = self.rx.recv() => {
                    let Some(request) = request else { break };
                    let outcome = self.attempt().await;
                    match request.reply {
                        Some(reply) => {
                            let _ = reply.send(outcome.map_err(ReloadError::from));
                        }
                        None => {
                            if let Err(e) = outcome {
                                tracing::error!(error = %e, "Error reloading config");
                            }
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Reload controller stopped");
    }

    async fn attempt(&self) -> Result<(), ConfigError> {
        let path = self.path.clone();
        let store = self.store.clone();
        let outcome = tokio::task::spawn_blocking(move || reload_into(&path, &store))
            .await
            .unwrap_or_else(|e| {
                Err(ConfigError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    e,
                )))
            });

        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
        }
        metrics::record_reload(outcome.is_ok());
        outcome
    }
}
