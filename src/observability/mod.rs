//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (process counters and gauges)
//!
//! Consumers:
//!     → stdout
//!     → /metrics endpoint (Prometheus scrape)
//! ```
//!
//! Per-probe metrics are a separate, request-scoped concern and live in
//! `crate::probe`.

pub mod logging;
pub mod metrics;
