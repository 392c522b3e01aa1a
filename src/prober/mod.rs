//! Protocol probers and the dispatch table.
//!
//! # Data Flow
//! ```text
//! Module.prober (ProberKind)
//!     → ProberTable::get (fixed at startup)
//!     → Arc<dyn Prober>
//!     → probe(ctx, target, module, registry) → bool
//! ```
//!
//! # Contract
//! - Honour the context: race I/O against `ctx.done()` or use `ctx.run`
//! - Register extra gauges on the given registry only
//! - Never register `probe_success` or `probe_duration_seconds`
//! - Report failure by returning `false`; errors are logged, not propagated

pub mod dns;
pub mod http;
pub mod icmp;
pub mod tcp;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::config::schema::{Module, ProberKind};
use crate::probe::{ProbeContext, ProbeRegistry};

/// A protocol-specific probe.
pub trait Prober: Send + Sync {
    fn probe<'a>(
        &'a self,
        ctx: &'a ProbeContext,
        target: &'a str,
        module: &'a Module,
        registry: &'a ProbeRegistry,
    ) -> BoxFuture<'a, bool>;
}

/// Read-only mapping from protocol kind to prober.
#[derive(Clone, Default)]
pub struct ProberTable {
    probers: HashMap<ProberKind, Arc<dyn Prober>>,
}

impl ProberTable {
    /// An empty table. Every lookup fails until probers are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in HTTP, TCP, ICMP and DNS probers.
    pub fn standard() -> Self {
        Self::new()
            .with(ProberKind::Http, http::HttpProber)
            .with(ProberKind::Tcp, tcp::TcpProber)
            .with(ProberKind::Icmp, icmp::IcmpProber)
            .with(ProberKind::Dns, dns::DnsProber)
    }

    pub fn with(mut self, kind: ProberKind, prober: impl Prober + 'static) -> Self {
        self.probers.insert(kind, Arc::new(prober));
        self
    }

    pub fn get(&self, kind: ProberKind) -> Option<&dyn Prober> {
        self.probers.get(&kind).map(|p| p.as_ref())
    }
}

impl fmt::Debug for ProberTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.probers.keys().collect();
        kinds.sort();
        f.debug_struct("ProberTable").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_covers_every_kind() {
        let table = ProberTable::standard();
        for kind in ProberKind::ALL {
            assert!(table.get(kind).is_some(), "missing prober for {kind}");
        }
    }

    #[test]
    fn test_empty_table_has_no_probers() {
        let table = ProberTable::new();
        assert!(table.get(ProberKind::Http).is_none());
        assert_eq!(format!("{table:?}"), "ProberTable { kinds: [] }");
    }
}
