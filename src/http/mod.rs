//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → security::access_control (client IP whitelist)
//!     → probe.rs (/probe orchestration)
//!       or admin (/, /config, /metrics, /-/reload, /-/healthy)
//!     → Send to client
//! ```

pub mod probe;
pub mod server;

pub use probe::{ProbeError, ProbeParams, DEFAULT_MODULE};
pub use server::{AppState, HttpServer};
