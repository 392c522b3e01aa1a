//! TCP prober: connect, then an optional expect/send conversation.

use std::time::Instant;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::config::schema::{Module, QueryResponse};
use crate::probe::{ProbeContext, ProbeRegistry};
use crate::prober::Prober;

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

impl Prober for TcpProber {
    fn probe<'a>(
        &'a self,
        ctx: &'a ProbeContext,
        target: &'a str,
        module: &'a Module,
        registry: &'a ProbeRegistry,
    ) -> BoxFuture<'a, bool> {
        Box::pin(probe_tcp(ctx, target, &module.tcp.query_response, registry))
    }
}

async fn probe_tcp(
    ctx: &ProbeContext,
    target: &str,
    steps: &[QueryResponse],
    registry: &ProbeRegistry,
) -> bool {
    let start = Instant::now();
    let stream = match ctx.run(TcpStream::connect(target)).await {
        Some(Ok(s)) => s,
        Some(Err(e)) => {
            tracing::debug!(probe_target = %target, error = %e, "TCP connect failed");
            return false;
        }
        None => return false,
    };
    registry
        .gauge(
            "probe_tcp_connect_duration_seconds",
            "Time taken to establish the TCP connection",
        )
        .set(start.elapsed().as_secs_f64());

    match ctx.run(converse(stream, steps)).await {
        Some(Ok(true)) => true,
        Some(Ok(false)) => {
            registry
                .gauge(
                    "probe_failed_due_to_expect",
                    "Indicates if probe failed because an expected line never arrived",
                )
                .set(1.0);
            false
        }
        Some(Err(e)) => {
            tracing::debug!(probe_target = %target, error = %e, "TCP conversation failed");
            false
        }
        None => false,
    }
}

/// Run the expect/send steps. `Ok(false)` means the peer closed before an expected line.
async fn converse(stream: TcpStream, steps: &[QueryResponse]) -> std::io::Result<bool> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    for step in steps {
        if let Some(expect) = &step.expect {
            loop {
                match lines.next_line().await? {
                    Some(line) if line.contains(expect.as_str()) => break,
                    Some(_) => continue,
                    None => return Ok(false),
                }
            }
        }
        if let Some(send) = &step.send {
            write_half.write_all(send.as_bytes()).await?;
            write_half.write_all(b"\n").await?;
        }
    }

    // The peer may already be gone once the conversation is over.
    let _ = write_half.shutdown().await;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProberKind;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn banner_server(banner: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(banner.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        addr.to_string()
    }

    #[tokio::test]
    async fn test_connect_only_succeeds() {
        let target = banner_server("hello\n").await;
        let ctx = ProbeContext::new(Duration::from_secs(5));
        let registry = ProbeRegistry::new();
        let module = Module::new(ProberKind::Tcp);

        assert!(TcpProber.probe(&ctx, &target, &module, &registry).await);
        assert!(registry.render().contains("probe_tcp_connect_duration_seconds"));
    }

    #[tokio::test]
    async fn test_expect_matches_banner() {
        let target = banner_server("220 mail.example.com ESMTP\n").await;
        let ctx = ProbeContext::new(Duration::from_secs(5));
        let registry = ProbeRegistry::new();
        let mut module = Module::new(ProberKind::Tcp);
        module.tcp.query_response.push(QueryResponse {
            expect: Some("ESMTP".into()),
            send: None,
        });

        assert!(TcpProber.probe(&ctx, &target, &module, &registry).await);
    }

    #[tokio::test]
    async fn test_missing_expectation_fails() {
        let target = banner_server("SSH-2.0-OpenSSH\n").await;
        let ctx = ProbeContext::new(Duration::from_secs(5));
        let registry = ProbeRegistry::new();
        let mut module = Module::new(ProberKind::Tcp);
        module.tcp.query_response.push(QueryResponse {
            expect: Some("ESMTP".into()),
            send: None,
        });

        assert!(!TcpProber.probe(&ctx, &target, &module, &registry).await);
        assert!(registry.render().contains("probe_failed_due_to_expect"));
    }

    #[tokio::test]
    async fn test_refused_connection_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap().to_string();
        drop(listener);

        let ctx = ProbeContext::new(Duration::from_secs(5));
        let registry = ProbeRegistry::new();
        let module = Module::new(ProberKind::Tcp);
        assert!(!TcpProber.probe(&ctx, &target, &module, &registry).await);
    }
}
