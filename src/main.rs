//! Blackbox Exporter
//!
//! Probes endpoints on demand and exposes the results for Prometheus.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /probe                ┌──────────────────────────────────────────────────┐
//!     ──────────────────────────┼─▶ whitelist ─▶ probe handler ─▶ ProberTable      │
//!                               │                    │                 │           │
//!                               │          SafeConfig snapshot     http/tcp/       │
//!                               │                    ▲             icmp/dns        │
//!     SIGHUP ───────┐           │                    │                             │
//!     POST /-/reload├──────────▶│  ReloadController ─┘  (one attempt at a time)    │
//!     file watcher ─┘           │                                                  │
//!                               └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use blackbox_exporter::config::reload::ReloadController;
use blackbox_exporter::config::watcher::ConfigWatcher;
use blackbox_exporter::http::{AppState, HttpServer};
use blackbox_exporter::lifecycle::startup::{self, Prepared};
use blackbox_exporter::lifecycle::{signals, Shutdown};
use blackbox_exporter::observability::{logging, metrics};
use blackbox_exporter::probe::timeout::DEFAULT_TIMEOUT_OFFSET_SECS;
use blackbox_exporter::prober::ProberTable;
use blackbox_exporter::security::whitelist::ALLOW_ALL;

#[derive(Parser, Debug)]
#[command(name = "blackbox-exporter", version)]
#[command(about = "Probe endpoints over HTTP, TCP, ICMP and DNS for Prometheus", long_about = None)]
struct Cli {
    /// Blackbox exporter configuration file.
    #[arg(long = "config.file", default_value = "blackbox.toml")]
    config_file: PathBuf,

    /// The address to listen on for HTTP requests.
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9115")]
    listen_address: String,

    /// Offset to subtract from timeout in seconds.
    #[arg(long = "timeout-offset", default_value_t = DEFAULT_TIMEOUT_OFFSET_SECS)]
    timeout_offset: f64,

    /// Comma-separated addresses and CIDR blocks allowed to connect.
    #[arg(long = "web.ip-whitelist", default_value = ALLOW_ALL)]
    ip_whitelist: String,

    /// Validate the configuration file and exit.
    #[arg(long = "config.check")]
    config_check: bool,

    /// Reload automatically when the configuration file changes.
    #[arg(long = "config.watch")]
    config_watch: bool,

    /// Log level used when RUST_LOG is not set.
    #[arg(long = "log.level", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting blackbox_exporter");

    let metrics_handle = metrics::init_metrics()?;

    let Prepared { store, whitelist } =
        startup::prepare(&cli.config_file, &cli.ip_whitelist).map_err(|e| {
            tracing::error!(path = %cli.config_file.display(), error = %e, "Startup failed");
            e
        })?;
    metrics::record_reload(true);

    if cli.config_check {
        tracing::info!("Config file is ok, exiting...");
        return Ok(());
    }

    let shutdown = Shutdown::new();

    let (controller, reload) = ReloadController::new(&cli.config_file, store.clone());
    tokio::spawn(controller.run(shutdown.subscribe()));

    let hangup = signals::reload_on_hangup(reload.clone(), shutdown.subscribe());
    tokio::spawn(async move {
        if let Err(e) = hangup.await {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
        }
    });

    let _watcher = if cli.config_watch {
        Some(ConfigWatcher::new(&cli.config_file, reload.clone()).run()?)
    } else {
        None
    };

    tokio::spawn(shutdown.clone().on_termination());

    let state = AppState::new(store, ProberTable::standard(), reload)
        .with_timeout_offset(cli.timeout_offset)
        .with_metrics(metrics_handle);

    let listener = TcpListener::bind(&cli.listen_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(state, whitelist)
        .run(listener, shutdown.signalled())
        .await?;

    // Stop background tasks if the server exited on its own.
    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
