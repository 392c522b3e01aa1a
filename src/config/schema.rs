//! Configuration schema definitions.
//!
//! This module defines the module file structure for the exporter.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration: every probe recipe, keyed by module name.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Module definitions.
    pub modules: BTreeMap<String, Module>,
}

impl Config {
    /// Look up a module by name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }
}

/// Protocol a module probes with.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProberKind {
    Http,
    Tcp,
    Icmp,
    Dns,
}

impl ProberKind {
    pub const ALL: [ProberKind; 4] = [Self::Http, Self::Tcp, Self::Icmp, Self::Dns];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tcp => "tcp",
            Self::Icmp => "icmp",
            Self::Dns => "dns",
        }
    }
}

impl fmt::Display for ProberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named probe recipe.
///
/// Only `prober` and `timeout_secs` are read by the orchestrator; the
/// protocol tables belong to the matching prober.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Module {
    /// Which prober runs this module.
    pub prober: ProberKind,

    /// Upper bound for a single probe in seconds (0 = use the scrape default).
    #[serde(default)]
    pub timeout_secs: f64,

    #[serde(default)]
    pub http: HttpProbe,

    #[serde(default)]
    pub tcp: TcpProbe,

    #[serde(default)]
    pub icmp: IcmpProbe,

    #[serde(default)]
    pub dns: DnsProbe,
}

impl Module {
    /// Create a module with default protocol settings.
    pub fn new(prober: ProberKind) -> Self {
        Self {
            prober,
            timeout_secs: 0.0,
            http: HttpProbe::default(),
            tcp: TcpProbe::default(),
            icmp: IcmpProbe::default(),
            dns: DnsProbe::default(),
        }
    }

    /// Builder-style timeout ceiling.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP prober settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HttpProbe {
    /// Request method.
    pub method: String,

    /// Accepted status codes. Empty means any 2xx.
    pub valid_status_codes: Vec<u16>,

    /// Extra request headers.
    pub headers: BTreeMap<String, String>,

    /// Optional request body.
    pub body: Option<String>,

    /// Do not follow redirects.
    pub no_follow_redirects: bool,

    /// Fail when the body contains any of these substrings.
    pub fail_if_body_contains: Vec<String>,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            valid_status_codes: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
            no_follow_redirects: false,
            fail_if_body_contains: Vec::new(),
        }
    }
}

/// TCP prober settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct TcpProbe {
    /// Conversation run after the connection is established, in order.
    pub query_response: Vec<QueryResponse>,
}

/// One step of a TCP conversation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct QueryResponse {
    /// Wait for a line containing this text.
    pub expect: Option<String>,

    /// Then send this line (a trailing newline is added).
    pub send: Option<String>,
}

/// ICMP prober settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IcmpProbe {
    /// Payload size of the echo request in bytes.
    pub payload_size: usize,
}

impl Default for IcmpProbe {
    fn default() -> Self {
        Self { payload_size: 36 }
    }
}

/// DNS prober settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DnsProbe {
    /// Name to query.
    pub query_name: String,

    /// Record type, e.g. "A", "AAAA", "MX".
    pub query_type: String,

    /// Response codes counted as success.
    pub valid_rcodes: Vec<String>,

    /// Fail when the answer section is empty.
    pub fail_if_no_answer: bool,
}

impl Default for DnsProbe {
    fn default() -> Self {
        Self {
            query_name: String::new(),
            query_type: "ANY".to_string(),
            valid_rcodes: vec!["NOERROR".to_string()],
            fail_if_no_answer: false,
        }
    }
}
