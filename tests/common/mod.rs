//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tempfile::TempDir;
use tokio::net::TcpListener;

use blackbox_exporter::config::reload::{reload_into, ReloadController};
use blackbox_exporter::config::store::SafeConfig;
use blackbox_exporter::http::{AppState, HttpServer};
use blackbox_exporter::probe::{ProbeContext, ProbeRegistry};
use blackbox_exporter::security::IpWhitelist;
use blackbox_exporter::{Module, Prober, ProberKind, ProberTable, Shutdown};

pub const BASE_CONFIG: &str = r#"
[modules.http_2xx]
prober = "http"

[modules.tcp_connect]
prober = "tcp"
timeout_secs = 1.0

[modules.dns_udp]
prober = "dns"

[modules.dns_udp.dns]
query_name = "example.com"
"#;

/// What the fake prober saw for one call.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ProbeCall {
    pub target: String,
    pub kind: ProberKind,
    pub method: String,
    pub remaining: Duration,
}

/// Records every call. Targets containing "fail" report failure and targets
/// containing "slow" sleep briefly before answering.
#[derive(Clone, Default)]
pub struct FakeProber {
    pub calls: Arc<Mutex<Vec<ProbeCall>>>,
}

impl Prober for FakeProber {
    fn probe<'a>(
        &'a self,
        ctx: &'a ProbeContext,
        target: &'a str,
        module: &'a Module,
        registry: &'a ProbeRegistry,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(ProbeCall {
                target: target.to_string(),
                kind: module.prober,
                method: module.http.method.clone(),
                remaining: ctx.remaining(),
            });
            registry
                .gauge_with_labels(
                    "probe_fake_info",
                    "Target seen by the fake prober",
                    vec![("target", target.to_string())],
                )
                .set(1.0);
            if target.contains("slow") {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            !target.contains("fail")
        })
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub config_path: PathBuf,
    pub store: SafeConfig,
    pub prober: FakeProber,
    pub shutdown: Shutdown,
    _dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.prober.calls.lock().unwrap().clone()
    }

    pub fn write_config(&self, text: &str) {
        std::fs::write(&self.config_path, text).unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server with the fake prober behind the HTTP and TCP kinds only.
pub async fn spawn_server(config: &str, whitelist: &str) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("blackbox.toml");
    std::fs::write(&config_path, config).unwrap();

    let store = SafeConfig::default();
    reload_into(&config_path, &store).unwrap();

    let prober = FakeProber::default();
    let probers = ProberTable::new()
        .with(ProberKind::Http, prober.clone())
        .with(ProberKind::Tcp, prober.clone());

    let shutdown = Shutdown::new();
    let (controller, reload) = ReloadController::new(&config_path, store.clone());
    tokio::spawn(controller.run(shutdown.subscribe()));

    let state = AppState::new(store.clone(), probers, reload);
    let server = HttpServer::new(state, IpWhitelist::parse(whitelist).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let signalled = shutdown.signalled();
    tokio::spawn(async move {
        let _ = server.run(listener, signalled).await;
    });

    TestServer {
        addr,
        config_path,
        store,
        prober,
        shutdown,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
