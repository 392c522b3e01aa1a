//! HTTP prober.

use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};

use crate::config::schema::{HttpProbe, Module};
use crate::probe::{ProbeContext, ProbeRegistry};
use crate::prober::Prober;

const MAX_REDIRECTS: usize = 10;

/// Issues one request and checks the status code and body.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProber;

impl Prober for HttpProber {
    fn probe<'a>(
        &'a self,
        ctx: &'a ProbeContext,
        target: &'a str,
        module: &'a Module,
        registry: &'a ProbeRegistry,
    ) -> BoxFuture<'a, bool> {
        Box::pin(probe_http(ctx, target, &module.http, registry))
    }
}

async fn probe_http(
    ctx: &ProbeContext,
    target: &str,
    settings: &HttpProbe,
    registry: &ProbeRegistry,
) -> bool {
    let url = target_url(target);
    let method = match Method::from_bytes(settings.method.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(method = %settings.method, error = %e, "Invalid HTTP method");
            return false;
        }
    };

    let policy = if settings.no_follow_redirects {
        Policy::none()
    } else {
        Policy::limited(MAX_REDIRECTS)
    };
    let client = match reqwest::Client::builder()
        .redirect(policy)
        .timeout(ctx.remaining())
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return false;
        }
    };

    let mut request = client.request(method, &url);
    for (name, value) in &settings.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &settings.body {
        request = request.body(body.clone());
    }

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "HTTP request failed");
            return false;
        }
    };

    let status = response.status();
    registry
        .gauge("probe_http_status_code", "Response HTTP status code")
        .set(status.as_u16() as f64);
    registry
        .gauge("probe_http_ssl", "Indicates if SSL was used for the final request")
        .set(if response.url().scheme() == "https" { 1.0 } else { 0.0 });

    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Failed to read HTTP body");
            return false;
        }
    };
    registry
        .gauge("probe_http_content_length", "Length of http content response")
        .set(body.len() as f64);

    if !status_is_valid(status, &settings.valid_status_codes) {
        tracing::debug!(url = %url, status = %status, "Invalid HTTP response status code");
        return false;
    }

    if let Some(needle) = settings
        .fail_if_body_contains
        .iter()
        .find(|needle| body.contains(needle.as_str()))
    {
        tracing::debug!(url = %url, needle = %needle, "Body matched forbidden text");
        registry
            .gauge("probe_failed_due_to_body", "Indicates if probe failed due to body content")
            .set(1.0);
        return false;
    }

    true
}

/// Accept bare hosts as plain HTTP targets.
fn target_url(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{target}")
    }
}

fn status_is_valid(status: StatusCode, valid: &[u16]) -> bool {
    if valid.is_empty() {
        status.is_success()
    } else {
        valid.contains(&status.as_u16())
    }
}
