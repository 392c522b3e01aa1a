//! Probe execution core.
//!
//! # Data Flow
//! ```text
//! resolved Module + target + scrape hint
//!     → timeout.rs (negotiate budget, subtract offset)
//!     → context.rs (deadline + cancellation)
//!     → registry.rs (fresh, request-local metrics)
//!     → Prober::probe (protocol exchange)
//!     → registry.finish (duration, success)
//!     → rendered exposition text
//! ```
//!
//! Nothing here touches shared state; two probes never see each other's metrics.

pub mod context;
pub mod registry;
pub mod timeout;

use std::time::{Duration, Instant};

pub use context::ProbeContext;
pub use registry::{ProbeRegistry, PROBE_DURATION_SECONDS, PROBE_SUCCESS};

use crate::config::schema::Module;
use crate::prober::Prober;

/// What the orchestrator learned from one probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub success: bool,
    pub duration: Duration,
}

/// Run `prober` once and record the core gauges into `registry`.
///
/// The context is cancelled when this returns, and the prober future is
/// dropped if it is still pending at the deadline.
pub async fn execute(
    prober: &dyn Prober,
    ctx: &ProbeContext,
    target: &str,
    module: &Module,
    registry: &ProbeRegistry,
) -> ProbeOutcome {
    let _cancel = ctx.cancel_on_drop();
    let start = Instant::now();

    let success = ctx
        .run(prober.probe(ctx, target, module, registry))
        .await
        .unwrap_or_else(|| {
            tracing::debug!(probe_target = %target, "Probe did not finish before its deadline");
            false
        });

    let duration = start.elapsed();
    registry.finish(success, duration);
    ProbeOutcome { success, duration }
}
