//! Request-scoped metrics container.
//!
//! Each scrape gets its own un-installed Prometheus recorder, so nothing a
//! prober records can leak into another request or into `/metrics`.

use std::fmt;
use std::time::Duration;

use metrics::{Gauge, Key, KeyName, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};

/// Set to 1 when the probe succeeded.
pub const PROBE_SUCCESS: &str = "probe_success";

/// Wall time spent in the prober.
pub const PROBE_DURATION_SECONDS: &str = "probe_duration_seconds";

static METADATA: Metadata<'static> =
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// Metrics produced by a single probe.
pub struct ProbeRegistry {
    recorder: PrometheusRecorder,
    success: Gauge,
    duration: Gauge,
}

impl ProbeRegistry {
    /// Fresh registry seeded with the success and duration gauges.
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let success = register(
            &recorder,
            Key::from_name(PROBE_SUCCESS),
            "Displays whether or not the probe was a success",
        );
        let duration = register(
            &recorder,
            Key::from_name(PROBE_DURATION_SECONDS),
            "Returns how long the probe took to complete in seconds",
        );
        Self {
            recorder,
            success,
            duration,
        }
    }

    /// Register a prober-specific gauge.
    ///
    /// The two core names are owned by the orchestrator; asking for them
    /// returns a gauge that records nothing.
    pub fn gauge(&self, name: &'static str, help: &'static str) -> Gauge {
        self.gauge_with_labels(name, help, Vec::new())
    }

    pub fn gauge_with_labels(
        &self,
        name: &'static str,
        help: &'static str,
        labels: Vec<(&'static str, String)>,
    ) -> Gauge {
        if is_reserved(name) {
            tracing::warn!(metric = name, "Prober tried to register a reserved metric");
            return Gauge::noop();
        }
        let labels: Vec<Label> = labels.into_iter().map(|(k, v)| Label::new(k, v)).collect();
        register(&self.recorder, Key::from_parts(name, labels), help)
    }

    /// Record the orchestrator's verdict. Success stays 0 unless the probe returned true.
    pub(crate) fn finish(&self, success: bool, duration: Duration) {
        self.duration.set(duration.as_secs_f64());
        if success {
            self.success.set(1.0);
        }
    }

    /// Prometheus text exposition of everything registered so far.
    pub fn render(&self) -> String {
        self.recorder.handle().render()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRegistry").finish_non_exhaustive()
    }
}

fn is_reserved(name: &str) -> bool {
    name == PROBE_SUCCESS || name == PROBE_DURATION_SECONDS
}

fn register(recorder: &PrometheusRecorder, key: Key, help: &'static str) -> Gauge {
    recorder.describe_gauge(KeyName::from(key.name().to_string()), None, help.into());
    recorder.register_gauge(&key, &METADATA)
}

/// Parse a rendered exposition into `(series, value)` pairs. Test helper.
#[cfg(test)]
pub(crate) fn samples(text: &str) -> Vec<(String, f64)> {
    text.lines()
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty())
        .filter_map(|l| {
            let (series, value) = l.rsplit_once(' ')?;
            Some((series.to_string(), value.parse().ok()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_only_core_gauges() {
        let registry = ProbeRegistry::new();
        let samples = samples(&registry.render());
        assert_eq!(samples.len(), 2);
        assert!(samples.contains(&(PROBE_SUCCESS.to_string(), 0.0)));
        assert!(samples.contains(&(PROBE_DURATION_SECONDS.to_string(), 0.0)));
    }

    #[test]
    fn test_finish_sets_success_and_duration() {
        let registry = ProbeRegistry::new();
        registry.finish(true, Duration::from_millis(250));
        let samples = samples(&registry.render());
        assert!(samples.contains(&(PROBE_SUCCESS.to_string(), 1.0)));
        assert!(samples.contains(&(PROBE_DURATION_SECONDS.to_string(), 0.25)));
    }

    #[test]
    fn test_failed_probe_keeps_success_at_zero() {
        let registry = ProbeRegistry::new();
        registry.finish(false, Duration::from_millis(10));
        let samples = samples(&registry.render());
        assert!(samples.contains(&(PROBE_SUCCESS.to_string(), 0.0)));
    }

    #[test]
    fn test_reserved_names_cannot_be_overwritten() {
        let registry = ProbeRegistry::new();
        registry.gauge(PROBE_SUCCESS, "hijack").set(42.0);
        registry.finish(false, Duration::ZERO);
        let samples = samples(&registry.render());
        assert!(samples.contains(&(PROBE_SUCCESS.to_string(), 0.0)));
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_registries_are_isolated() {
        let a = ProbeRegistry::new();
        let b = ProbeRegistry::new();
        a.gauge("probe_http_status_code", "Response HTTP status code").set(200.0);
        b.gauge_with_labels("probe_ip_protocol", "IP protocol", vec![("family", "v6".into())])
            .set(6.0);

        let text_a = a.render();
        let text_b = b.render();
        assert!(text_a.contains("probe_http_status_code 200"));
        assert!(!text_a.contains("probe_ip_protocol"));
        assert!(text_b.contains("probe_ip_protocol{family=\"v6\"} 6"));
        assert!(!text_b.contains("probe_http_status_code"));
    }
}
