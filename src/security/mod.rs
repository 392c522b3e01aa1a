//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (client IP against whitelist)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Whitelist is built once at startup and never changes

pub mod access_control;
pub mod whitelist;

pub use access_control::ip_whitelist_middleware;
pub use whitelist::{IpWhitelist, WhitelistError};
