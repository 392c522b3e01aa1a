//! Administrative and informational endpoints.

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::http::probe::EXPOSITION_CONTENT_TYPE;
use crate::http::server::AppState;

const LANDING_PAGE: &str = r#"<html>
    <head><title>Blackbox Exporter</title></head>
    <body>
    <h1>Blackbox Exporter</h1>
    <p><a href="/probe?target=example.com&module=http_2xx">Probe example.com for http_2xx</a></p>
    <p><a href="/metrics">Metrics</a></p>
    <p><a href="/config">Configuration</a></p>
    </body>
    </html>"#;

pub async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

pub async fn healthy() -> &'static str {
    "Healthy\n"
}

/// `POST /-/reload`: run one reload attempt and report its outcome.
pub async fn reload_config(State(state): State<AppState>, method: Method) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            "This endpoint requires a POST request.\n",
        )
            .into_response();
    }

    match state.reload.reload().await {
        Ok(()) => (StatusCode::OK, "Config reloaded\n").into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to reload config: {e}\n"),
        )
            .into_response(),
    }
}

/// `GET /config`: the active configuration as TOML.
pub async fn get_config(State(state): State<AppState>) -> Response {
    let config = state.config.get();
    match toml::to_string(config.as_ref()) {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Error marshalling configuration");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `GET /metrics`: the exporter's own metrics.
pub async fn get_metrics(State(state): State<AppState>) -> Response {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
}
