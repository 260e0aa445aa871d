//! WAN interface configuration.

use serde::{Deserialize, Serialize};

/// WAN addressing mode. The mode decides which fields are mandatory; the
/// validation engine enforces that, including rejecting static fields that
/// are present under DHCP mode instead of silently ignoring them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WanMode {
    Static,
    Dhcp,
    Pppoe,
}

/// WAN interface configuration.
///
/// All address fields are plain strings: the reader hands them over as-is
/// and the validation engine reports syntax problems with field paths and
/// corrective examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WanConfig {
    /// Physical interface name (e.g. "ether1", "eth0").
    pub interface: String,

    /// Addressing mode.
    pub mode: WanMode,

    /// Static address. Required with `prefix`, `gateway` and `dns` when the
    /// mode is `Static`; must be absent otherwise.
    #[serde(default)]
    pub address: Option<String>,

    /// Static prefix length.
    #[serde(default)]
    pub prefix: Option<u8>,

    /// Static default gateway.
    #[serde(default)]
    pub gateway: Option<String>,

    /// Upstream DNS servers (static mode).
    #[serde(default)]
    pub dns: Vec<String>,

    /// PPPoE username. Required when the mode is `Pppoe`.
    #[serde(default)]
    pub pppoe_username: Option<String>,

    /// PPPoE password. Required when the mode is `Pppoe`.
    #[serde(default)]
    pub pppoe_password: Option<String>,
}

impl WanConfig {
    /// DHCP-addressed WAN on the given interface.
    pub fn dhcp(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            mode: WanMode::Dhcp,
            address: None,
            prefix: None,
            gateway: None,
            dns: vec![],
            pppoe_username: None,
            pppoe_password: None,
        }
    }

    /// Statically addressed WAN.
    pub fn static_addr(
        interface: impl Into<String>,
        address: impl Into<String>,
        prefix: u8,
        gateway: impl Into<String>,
        dns: Vec<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            mode: WanMode::Static,
            address: Some(address.into()),
            prefix: Some(prefix),
            gateway: Some(gateway.into()),
            dns,
            pppoe_username: None,
            pppoe_password: None,
        }
    }

    /// PPPoE WAN.
    pub fn pppoe(
        interface: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            mode: WanMode::Pppoe,
            address: None,
            prefix: None,
            gateway: None,
            dns: vec![],
            pppoe_username: Some(username.into()),
            pppoe_password: Some(password.into()),
        }
    }

    /// Whether any static-mode field is populated.
    pub fn has_static_fields(&self) -> bool {
        self.address.is_some()
            || self.prefix.is_some()
            || self.gateway.is_some()
            || !self.dns.is_empty()
    }
}
