//! ICMP echo prober.
//!
//! Uses unprivileged datagram ICMP sockets (Linux `ping_group_range`, macOS).
//! The kernel strips the IP header on receive and owns the echo identifier,
//! so replies are matched on sequence number only.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Instant;

use futures_util::future::BoxFuture;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::config::schema::Module;
use crate::probe::{ProbeContext, ProbeRegistry};
use crate::prober::Prober;

const ECHO_REQUEST_V4: u8 = 8;
const ECHO_REPLY_V4: u8 = 0;
const ECHO_REQUEST_V6: u8 = 128;
const ECHO_REPLY_V6: u8 = 129;
const HEADER_LEN: usize = 8;

/// Largest payload that fits one IPv4 datagram alongside the echo header.
pub const MAX_PAYLOAD_SIZE: usize = 65507 - HEADER_LEN;

static NEXT_SEQ: AtomicU16 = AtomicU16::new(1);

#[derive(Debug, Clone, Copy, Default)]
pub struct IcmpProber;

impl Prober for IcmpProber {
    fn probe<'a>(
        &'a self,
        ctx: &'a ProbeContext,
        target: &'a str,
        module: &'a Module,
        registry: &'a ProbeRegistry,
    ) -> BoxFuture<'a, bool> {
        Box::pin(probe_icmp(ctx, target, module.icmp.payload_size, registry))
    }
}

async fn probe_icmp(
    ctx: &ProbeContext,
    target: &str,
    payload_size: usize,
    registry: &ProbeRegistry,
) -> bool {
    let ip = match ctx.run(resolve(target)).await {
        Some(Ok(ip)) => ip,
        Some(Err(e)) => {
            tracing::debug!(probe_target = %target, error = %e, "Failed to resolve ICMP target");
            return false;
        }
        None => return false,
    };
    registry
        .gauge("probe_ip_protocol", "Specifies whether probe ip protocol is IP4 or IP6")
        .set(if ip.is_ipv4() { 4.0 } else { 6.0 });

    let start = Instant::now();
    match ctx.run(echo(ip, payload_size)).await {
        Some(Ok(())) => {
            registry
                .gauge_with_labels(
                    "probe_icmp_duration_seconds",
                    "Duration of icmp request by phase",
                    vec![("phase", "rtt".to_string())],
                )
                .set(start.elapsed().as_secs_f64());
            true
        }
        Some(Err(e)) => {
            tracing::debug!(probe_target = %target, error = %e, "ICMP echo failed");
            false
        }
        None => false,
    }
}

async fn resolve(target: &str) -> std::io::Result<IpAddr> {
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }
    tokio::net::lookup_host((target, 0))
        .await?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address for {target}"),
            )
        })
}

async fn echo(ip: IpAddr, payload_size: usize) -> std::io::Result<()> {
    let socket = open_socket(ip)?;
    let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
    let request = echo_request(ip.is_ipv4(), seq, payload_size);
    socket.send_to(&request, SocketAddr::new(ip, 0)).await?;

    let expected = if ip.is_ipv4() { ECHO_REPLY_V4 } else { ECHO_REPLY_V6 };
    let mut buf = vec![0u8; HEADER_LEN + payload_size + 64];
    loop {
        let (len, from) = socket.recv_from(&mut buf).await?;
        if from.ip() == ip && is_reply(&buf[..len], expected, seq) {
            return Ok(());
        }
    }
}

fn open_socket(ip: IpAddr) -> std::io::Result<UdpSocket> {
    let (domain, protocol) = match ip {
        IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
        IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(protocol))?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

/// Build an echo request. IPv6 checksums are filled in by the kernel.
fn echo_request(v4: bool, seq: u16, payload_size: usize) -> Vec<u8> {
    let mut packet = vec![0u8; HEADER_LEN + payload_size];
    packet[0] = if v4 { ECHO_REQUEST_V4 } else { ECHO_REQUEST_V6 };
    packet[6..8].copy_from_slice(&seq.to_be_bytes());
    for (i, byte) in packet[HEADER_LEN..].iter_mut().enumerate() {
        *byte = i as u8;
    }
    if v4 {
        let sum = checksum(&packet);
        packet[2..4].copy_from_slice(&sum.to_be_bytes());
    }
    packet
}

fn is_reply(packet: &[u8], expected_type: u8, seq: u16) -> bool {
    packet.len() >= HEADER_LEN
        && packet[0] == expected_type
        && u16::from_be_bytes([packet[6], packet[7]]) == seq
}

/// RFC 1071 internet checksum.
fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]) as u32,
            [hi] => u16::from_be_bytes([*hi, 0]) as u32,
            _ => 0,
        })
        .sum();
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
