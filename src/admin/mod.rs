//! Administrative routes: landing page, config inspection, reload, self metrics.
//!
//! Access control is applied by the outer router, not here.

pub mod handlers;

use axum::{
    routing::{any, get},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing_page))
        .route("/config", get(get_config))
        .route("/metrics", get(get_metrics))
        .route("/-/reload", any(reload_config))
        .route("/-/healthy", get(healthy))
}
