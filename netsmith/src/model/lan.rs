//! LAN/bridge configuration and the shared DHCP server block.

use serde::{Deserialize, Serialize};

/// DHCP server settings, nested under a LAN or VLAN.
///
/// Topology invariants (pool ordering, containment in the enclosing subnet,
/// gateway outside the pool) are checked by the validation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhcpConfig {
    /// Whether the server is enabled. A disabled block is kept so the
    /// operator can toggle it without re-entering the pool.
    pub enabled: bool,

    /// First address of the pool.
    pub pool_start: String,

    /// Last address of the pool.
    pub pool_end: String,

    /// Lease duration in seconds.
    pub lease_seconds: u32,

    /// DNS servers handed to clients.
    #[serde(default)]
    pub dns: Vec<String>,
}

impl DhcpConfig {
    /// Enabled server with a one-day lease.
    pub fn new(pool_start: impl Into<String>, pool_end: impl Into<String>) -> Self {
        Self {
            enabled: true,
            pool_start: pool_start.into(),
            pool_end: pool_end.into(),
            lease_seconds: 86_400,
            dns: vec![],
        }
    }

    /// Set the lease duration in seconds.
    pub fn with_lease_seconds(mut self, seconds: u32) -> Self {
        self.lease_seconds = seconds;
        self
    }

    /// Set the DNS servers handed to clients.
    pub fn with_dns(mut self, dns: Vec<String>) -> Self {
        self.dns = dns;
        self
    }
}

/// LAN/bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanConfig {
    /// Bridge or interface name (e.g. "bridge-lan", "switch0").
    pub interface: String,

    /// Gateway address of the LAN (the device's own address).
    pub address: String,

    /// Prefix length of the LAN subnet.
    pub prefix: u8,

    /// Optional DHCP server on this LAN.
    #[serde(default)]
    pub dhcp: Option<DhcpConfig>,
}

impl LanConfig {
    pub fn new(interface: impl Into<String>, address: impl Into<String>, prefix: u8) -> Self {
        Self {
            interface: interface.into(),
            address: address.into(),
            prefix,
            dhcp: None,
        }
    }

    /// Attach a DHCP server.
    pub fn with_dhcp(mut self, dhcp: DhcpConfig) -> Self {
        self.dhcp = Some(dhcp);
        self
    }

    /// The LAN subnet in CIDR notation (address/prefix as given; the
    /// validation engine decides whether it parses).
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix)
    }
}
