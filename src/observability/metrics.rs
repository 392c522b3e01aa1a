//! Process metrics, served on `/metrics`.
//!
//! These go through the global recorder and describe the exporter itself.
//! Probe results never touch it; see [`crate::probe::ProbeRegistry`].
//!
//! # Metrics
//! - `blackbox_exporter_build_info` (gauge): always 1, labelled with the version
//! - `blackbox_exporter_probes_total` (counter): completed probes by module, result
//! - `blackbox_exporter_config_last_reload_successful` (gauge): 1 if the last reload worked
//! - `blackbox_exporter_config_last_reload_success_timestamp_seconds` (gauge)

use std::time::{SystemTime, UNIX_EPOCH};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const BUILD_INFO: &str = "blackbox_exporter_build_info";
const PROBES_TOTAL: &str = "blackbox_exporter_probes_total";
const RELOAD_SUCCESSFUL: &str = "blackbox_exporter_config_last_reload_successful";
const RELOAD_TIMESTAMP: &str = "blackbox_exporter_config_last_reload_success_timestamp_seconds";

/// Install the global Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_gauge!(BUILD_INFO, "A metric with a constant '1' value labeled by version");
    describe_counter!(PROBES_TOTAL, "Number of completed probes by module and result");
    describe_gauge!(RELOAD_SUCCESSFUL, "Blackbox exporter config loaded successfully");
    describe_gauge!(
        RELOAD_TIMESTAMP,
        "Timestamp of the last successful configuration reload"
    );

    gauge!(BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::info!("Metrics recorder installed");
    Ok(handle)
}

/// Record the outcome of one reload attempt.
pub fn record_reload(success: bool) {
    if success {
        gauge!(RELOAD_SUCCESSFUL).set(1.0);
        gauge!(RELOAD_TIMESTAMP).set(unix_now());
    } else {
        gauge!(RELOAD_SUCCESSFUL).set(0.0);
    }
}

/// Count a completed probe.
pub fn record_probe(module: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(PROBES_TOTAL, "module" => module.to_string(), "result" => result).increment(1);
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
