//! Client address allow-list.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

/// Default for `--web.ip-whitelist`: every IPv4 and IPv6 address.
pub const ALLOW_ALL: &str = "0.0.0.0/0,::/0";

#[derive(Debug, thiserror::Error)]
#[error("invalid whitelist entry {entry:?}: {source}")]
pub struct WhitelistError {
    entry: String,
    #[source]
    source: ipnetwork::IpNetworkError,
}

/// Ordered set of networks allowed to reach the exporter.
///
/// Immutable once built; a bare address is an exact-match network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpWhitelist {
    networks: Vec<IpNetwork>,
}

impl IpWhitelist {
    /// Parse a comma-separated list of addresses and CIDR blocks.
    ///
    /// Any malformed entry rejects the whole list.
    pub fn parse(list: &str) -> Result<Self, WhitelistError> {
        let networks = list
            .split(',')
            .map(str::trim)
            .map(|entry| {
                IpNetwork::from_str(entry).map_err(|source| WhitelistError {
                    entry: entry.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { networks })
    }

    /// True if `addr` falls inside at least one network of the same family.
    ///
    /// IPv4-mapped IPv6 addresses, as seen on dual-stack listeners, are
    /// matched as the IPv4 address they carry.
    pub fn allows(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        self.networks.iter().any(|net| net.contains(addr))
    }
}

impl fmt::Display for IpWhitelist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, net) in self.networks.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", net)?;
        }
        Ok(())
    }
}
