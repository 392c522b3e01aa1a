//! Scrape timeout negotiation.
//!
//! The caller's hint (or a 10s default) is clamped to the module ceiling,
//! then a fixed offset is subtracted to leave room for writing the response.

use std::num::ParseFloatError;
use std::time::Duration;

use crate::config::schema::Module;

/// Header Prometheus sets to announce its scrape timeout.
pub const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

/// Used when no usable hint is present.
pub const DEFAULT_SCRAPE_TIMEOUT_SECS: f64 = 10.0;

/// Default for `--timeout-offset`.
pub const DEFAULT_TIMEOUT_OFFSET_SECS: f64 = 0.5;

/// Longest budget a single probe can get, so deadline arithmetic stays in range.
const MAX_BUDGET: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum TimeoutHintError {
    #[error("Failed to parse timeout from Prometheus header: {0}")]
    Parse(#[from] ParseFloatError),

    #[error("Failed to parse timeout from Prometheus header: {0:?} is not a finite number")]
    NotFinite(String),

    #[error("Failed to parse timeout from Prometheus header: value is not valid text")]
    NotText,
}

/// Effective probe budget in seconds.
///
/// The result may be zero or negative; callers turn that into an
/// already-expired deadline via [`budget`].
pub fn negotiate(hint: Option<&str>, module: &Module, offset: f64) -> Result<f64, TimeoutHintError> {
    let mut timeout = match hint.filter(|h| !h.is_empty()) {
        Some(raw) => {
            let secs: f64 = raw.trim().parse()?;
            if !secs.is_finite() {
                return Err(TimeoutHintError::NotFinite(raw.to_string()));
            }
            secs
        }
        None => 0.0,
    };
    if timeout == 0.0 {
        timeout = DEFAULT_SCRAPE_TIMEOUT_SECS;
    }

    if module.timeout_secs > 0.0 && module.timeout_secs < timeout {
        timeout = module.timeout_secs;
    }

    Ok(timeout - offset)
}

/// Convert negotiated seconds into a bounded, non-negative duration.
pub fn budget(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs)
        .map(|d| d.min(MAX_BUDGET))
        .unwrap_or(MAX_BUDGET)
}
