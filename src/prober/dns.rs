//! DNS prober.
//!
//! Sends a single recursive query over UDP and judges the decoded response by
//! its response code and section counts. Record data is not inspected.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU16, Ordering};

use futures_util::future::BoxFuture;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use hickory_proto::ProtoError;
use tokio::net::UdpSocket;

use crate::config::schema::{DnsProbe, Module};
use crate::probe::{ProbeContext, ProbeRegistry};
use crate::prober::Prober;

const DNS_PORT: u16 = 53;
const MAX_RESPONSE: usize = 4096;

static NEXT_ID: AtomicU16 = AtomicU16::new(1);

#[derive(Debug, Clone, Copy, Default)]
pub struct DnsProber;

impl Prober for DnsProber {
    fn probe<'a>(
        &'a self,
        ctx: &'a ProbeContext,
        target: &'a str,
        module: &'a Module,
        registry: &'a ProbeRegistry,
    ) -> BoxFuture<'a, bool> {
        Box::pin(probe_dns(ctx, target, &module.dns, registry))
    }
}

/// Record type for a mnemonic like `"aaaa"`.
pub fn record_type_from_name(name: &str) -> Option<RecordType> {
    RecordType::from_str(&name.to_ascii_uppercase()).ok()
}

/// Response code for a mnemonic like `"NXDOMAIN"`.
pub fn rcode_from_name(name: &str) -> Option<ResponseCode> {
    let code = match name.to_ascii_uppercase().as_str() {
        "NOERROR" => ResponseCode::NoError,
        "FORMERR" => ResponseCode::FormErr,
        "SERVFAIL" => ResponseCode::ServFail,
        "NXDOMAIN" => ResponseCode::NXDomain,
        "NOTIMP" => ResponseCode::NotImp,
        "REFUSED" => ResponseCode::Refused,
        "YXDOMAIN" => ResponseCode::YXDomain,
        "YXRRSET" => ResponseCode::YXRRSet,
        "NXRRSET" => ResponseCode::NXRRSet,
        "NOTAUTH" => ResponseCode::NotAuth,
        "NOTZONE" => ResponseCode::NotZone,
        _ => return None,
    };
    Some(code)
}

/// Recursive query for `name`/`qtype`, ready to send.
pub fn build_query(id: u16, name: &str, qtype: RecordType) -> Result<Message, ProtoError> {
    let mut name = Name::from_str(name)?;
    name.set_fqdn(true);

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, qtype));
    Ok(message)
}

async fn probe_dns(
    ctx: &ProbeContext,
    target: &str,
    settings: &DnsProbe,
    registry: &ProbeRegistry,
) -> bool {
    let Some(qtype) = record_type_from_name(&settings.query_type) else {
        tracing::warn!(query_type = %settings.query_type, "Unknown DNS record type");
        return false;
    };
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let query = match build_query(id, &settings.query_name, qtype).and_then(|m| m.to_vec()) {
        Ok(q) => q,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode DNS query");
            return false;
        }
    };

    let response = match ctx.run(exchange(target, id, &query)).await {
        Some(Ok(r)) => r,
        Some(Err(e)) => {
            tracing::debug!(probe_target = %target, error = %e, "DNS exchange failed");
            return false;
        }
        None => return false,
    };

    registry
        .gauge("probe_dns_answer_rrs", "Returns number of entries in the answer resource record list")
        .set(response.answer_count() as f64);
    registry
        .gauge("probe_dns_authority_rrs", "Returns number of entries in the authority resource record list")
        .set(response.name_server_count() as f64);
    registry
        .gauge("probe_dns_additional_rrs", "Returns number of entries in the additional resource record list")
        .set(response.additional_count() as f64);

    let rcode = response.response_code();
    let rcode_ok = settings
        .valid_rcodes
        .iter()
        .filter_map(|r| rcode_from_name(r))
        .any(|r| r == rcode);
    if !rcode_ok {
        tracing::debug!(rcode = %rcode, "DNS response code not accepted");
        return false;
    }

    !(settings.fail_if_no_answer && response.answer_count() == 0)
}

async fn exchange(target: &str, id: u16, query: &[u8]) -> std::io::Result<Message> {
    let server = resolve_server(target).await?;
    let unspecified = if server.is_ipv4() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    };
    let socket = UdpSocket::bind(SocketAddr::new(unspecified, 0)).await?;
    socket.connect(server).await?;
    socket.send(query).await?;

    let mut buf = vec![0u8; MAX_RESPONSE];
    loop {
        let len = socket.recv(&mut buf).await?;
        let message = Message::from_vec(&buf[..len])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if message.id() == id && message.message_type() == MessageType::Response {
            return Ok(message);
        }
    }
}

/// Accept `host`, `host:port`, `ip`, `ip:port` and `[v6]:port`.
async fn resolve_server(target: &str) -> std::io::Result<SocketAddr> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = target.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }
    let with_port = if target.contains(':') {
        target.to_string()
    } else {
        format!("{target}:{DNS_PORT}")
    };
    tokio::net::lookup_host(with_port).await?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no address for {target}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProberKind;
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{RData, Record};
    use std::time::Duration;

    #[test]
    fn test_query_round_trips_through_wire_format() {
        let bytes = build_query(0xBEEF, "example.com", RecordType::AAAA)
            .and_then(|m| m.to_vec())
            .unwrap();
        let decoded = Message::from_vec(&bytes).unwrap();
        assert_eq!(decoded.id(), 0xBEEF);
        assert!(decoded.recursion_desired());
        assert_eq!(decoded.queries().len(), 1);
        assert_eq!(decoded.queries()[0].query_type(), RecordType::AAAA);
        assert_eq!(decoded.queries()[0].name().to_ascii(), "example.com.");
    }

    #[test]
    fn test_query_rejects_oversized_label() {
        assert!(build_query(1, &format!("{}.com", "x".repeat(64)), RecordType::A).is_err());
    }

    #[test]
    fn test_mnemonics_are_case_insensitive() {
        assert_eq!(record_type_from_name("aaaa"), Some(RecordType::AAAA));
        assert_eq!(record_type_from_name("ANY"), Some(RecordType::ANY));
        assert_eq!(rcode_from_name("NxDomain"), Some(ResponseCode::NXDomain));
        assert_eq!(record_type_from_name("BOGUS"), None);
        assert_eq!(rcode_from_name("MAYBE"), None);
    }

    /// Answers every query with `rcode` and a single A record.
    async fn fake_resolver(rcode: ResponseCode) -> String {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let request = Message::from_vec(&buf[..len]).unwrap();
                let name = request.queries()[0].name().clone();
                let mut reply = Message::new();
                reply
                    .set_id(request.id())
                    .set_message_type(MessageType::Response)
                    .set_op_code(OpCode::Query)
                    .set_response_code(rcode)
                    .add_queries(request.queries().to_vec())
                    .add_answer(Record::from_rdata(name, 60, RData::A(A::new(127, 0, 0, 1))));
                let _ = socket.send_to(&reply.to_vec().unwrap(), peer).await;
            }
        });
        addr.to_string()
    }

    fn module(valid: &[&str]) -> Module {
        let mut module = Module::new(ProberKind::Dns);
        module.dns.query_name = "example.com".into();
        module.dns.query_type = "A".into();
        module.dns.valid_rcodes = valid.iter().map(|s| s.to_string()).collect();
        module
    }

    #[tokio::test]
    async fn test_answer_from_fake_resolver() {
        let target = fake_resolver(ResponseCode::NoError).await;
        let ctx = ProbeContext::new(Duration::from_secs(5));
        let registry = ProbeRegistry::new();

        assert!(DnsProber.probe(&ctx, &target, &module(&["NOERROR"]), &registry).await);
        assert!(registry.render().contains("probe_dns_answer_rrs 1"));
    }

    #[tokio::test]
    async fn test_unexpected_rcode_fails() {
        let target = fake_resolver(ResponseCode::NXDomain).await;
        let ctx = ProbeContext::new(Duration::from_secs(5));
        let registry = ProbeRegistry::new();

        assert!(!DnsProber.probe(&ctx, &target, &module(&["NOERROR"]), &registry).await);
        assert!(DnsProber.probe(&ctx, &target, &module(&["NXDOMAIN"]), &registry).await);
    }
}
