//! Scrape endpoint: `GET /probe?target=...&module=...&config=...`.
//!
//! # Flow
//! 1. Require `target`
//! 2. Resolve `module` (default `http_2xx`) against a config snapshot
//! 3. Negotiate the timeout from the scrape header and module ceiling
//! 4. Merge the optional `config` fragment onto a copy of the module
//! 5. Pick the prober for the module's kind
//! 6. Run it against a fresh registry and render that registry
//!
//! A failed probe is still a 200 carrying `probe_success 0`.

use std::borrow::Cow;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::config::overrides::OverrideError;
use crate::config::schema::ProberKind;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::probe::timeout::{self, TimeoutHintError, SCRAPE_TIMEOUT_HEADER};
use crate::probe::{self as probe_core, ProbeContext, ProbeRegistry};

/// Module used when the scrape does not name one.
pub const DEFAULT_MODULE: &str = "http_2xx";

/// Content type of the Prometheus text format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Default, Deserialize)]
pub struct ProbeParams {
    pub module: Option<String>,
    pub target: Option<String>,
    pub config: Option<String>,
}

/// Why a scrape was rejected before the prober ran.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Target parameter is missing")]
    MissingTarget,

    #[error("Unknown module {0:?}")]
    UnknownModule(String),

    #[error(transparent)]
    TimeoutHint(#[from] TimeoutHintError),

    #[error("{0}")]
    Override(#[from] OverrideError),

    #[error("Unknown prober {:?}", .0.as_str())]
    UnknownProber(ProberKind),
}

impl ProbeError {
    pub fn status(&self) -> StatusCode {
        match self {
            // The header comes from the scraper, not the person asking for the probe.
            ProbeError::TimeoutHint(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = %status, error = %self, "Rejected probe request");
        (status, format!("{self}\n")).into_response()
    }
}

pub async fn probe_handler(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
    headers: HeaderMap,
) -> Result<Response, ProbeError> {
    let target = params
        .target
        .filter(|t| !t.is_empty())
        .ok_or(ProbeError::MissingTarget)?;
    let module_name = params
        .module
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MODULE.to_string());

    let config = state.config.get();
    let base = config
        .module(&module_name)
        .ok_or_else(|| ProbeError::UnknownModule(module_name.clone()))?;

    let hint = headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .map(|v| v.to_str().map_err(|_| TimeoutHintError::NotText))
        .transpose()?;
    let budget = timeout::budget(timeout::negotiate(hint, base, state.timeout_offset)?);

    let module = match params.config.as_deref().filter(|c| !c.is_empty()) {
        Some(fragment) => Cow::Owned(base.with_override(&module_name, fragment)?),
        None => Cow::Borrowed(base),
    };

    let prober = state
        .probers
        .get(module.prober)
        .ok_or(ProbeError::UnknownProber(module.prober))?;

    let registry = ProbeRegistry::new();
    let ctx = ProbeContext::new(budget);
    let outcome = probe_core::execute(prober, &ctx, &target, &module, &registry).await;

    tracing::debug!(
        module = %module_name,
        probe_target = %target,
        success = outcome.success,
        duration_ms = outcome.duration.as_millis() as u64,
        budget_ms = budget.as_millis() as u64,
        "Probe finished"
    );
    metrics::record_probe(&module_name, outcome.success);

    Ok((
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        registry.render(),
    )
        .into_response())
}
