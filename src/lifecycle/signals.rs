//! OS signal handling.
//!
//! # Responsibilities
//! - SIGHUP → queue a config reload (no reply expected)
//! - SIGINT / SIGTERM → trigger graceful shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers config reload, not shutdown

use tokio::sync::broadcast;

use crate::config::reload::ReloadHandle;

/// Forward every SIGHUP to the reload controller until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(
    reload: ReloadHandle,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!("SIGHUP received, reloading config");
                reload.trigger();
            }
            _ = shutdown.recv() => break,
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(
    _reload: ReloadHandle,
    _shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    Ok(())
}

/// Resolve when the process is asked to stop.
pub async fn termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
