//! Blackbox Exporter Library
//!
//! Probes endpoints over HTTP, TCP, ICMP and DNS on demand and reports the
//! outcome in the Prometheus text format.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod prober;
pub mod security;

pub use config::schema::{Config, Module, ProberKind};
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use prober::{Prober, ProberTable};
