//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (whitelist, tracing, request ID)
//! - Bind server to listener with client address info
//! - Graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::admin_routes;
use crate::config::reload::ReloadHandle;
use crate::config::store::SafeConfig;
use crate::http::probe::probe_handler;
use crate::probe::timeout::DEFAULT_TIMEOUT_OFFSET_SECS;
use crate::prober::ProberTable;
use crate::security::{ip_whitelist_middleware, IpWhitelist};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active module configuration.
    pub config: SafeConfig,
    /// Prober per protocol kind, fixed at startup.
    pub probers: Arc<ProberTable>,
    /// Queue into the reload controller.
    pub reload: ReloadHandle,
    /// Seconds subtracted from every negotiated timeout.
    pub timeout_offset: f64,
    /// Render handle for `/metrics`, if a global recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: SafeConfig, probers: ProberTable, reload: ReloadHandle) -> Self {
        Self {
            config,
            probers: Arc::new(probers),
            reload,
            timeout_offset: DEFAULT_TIMEOUT_OFFSET_SECS,
            metrics: None,
        }
    }

    pub fn with_timeout_offset(mut self, offset: f64) -> Self {
        self.timeout_offset = offset;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// HTTP server for the exporter.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, whitelist: IpWhitelist) -> Self {
        let router = Self::build_router(state, whitelist);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The whitelist sits directly around the handlers, so a denied client
    /// causes nothing beyond the trace log line.
    fn build_router(state: AppState, whitelist: IpWhitelist) -> Router {
        Router::new()
            .route("/probe", get(probe_handler))
            .merge(admin_routes())
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                Arc::new(whitelist),
                ip_whitelist_middleware,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
