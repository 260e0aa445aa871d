//! VLAN configuration.

use serde::{Deserialize, Serialize};

use super::DhcpConfig;

/// What a VLAN is for. Generators use this to decide isolation rules:
/// guest and IoT VLANs are firewalled off from the LAN and from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanPurpose {
    General,
    Management,
    Guest,
    Iot,
    Voice,
}

impl VlanPurpose {
    /// Whether traffic from this VLAN is cut off from the trusted LAN.
    pub fn is_isolated(&self) -> bool {
        matches!(self, VlanPurpose::Guest | VlanPurpose::Iot)
    }
}

/// One VLAN.
///
/// Ids must be unique within a config and subnets mutually disjoint
/// (and disjoint from the LAN subnet); the validation engine enforces both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanConfig {
    /// 802.1Q id, 1-4094.
    pub id: u16,

    /// Human-readable name, used in interface naming.
    pub name: String,

    /// Subnet in CIDR notation (e.g. "10.0.20.0/24"). The device takes the
    /// first usable host address as its own on this VLAN.
    pub subnet: String,

    /// Optional DHCP server on this VLAN.
    #[serde(default)]
    pub dhcp: Option<DhcpConfig>,

    /// Purpose/zone tag.
    #[serde(default = "VlanConfig::default_purpose")]
    pub purpose: VlanPurpose,
}

impl VlanConfig {
    pub fn new(id: u16, name: impl Into<String>, subnet: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            subnet: subnet.into(),
            dhcp: None,
            purpose: VlanPurpose::General,
        }
    }

    fn default_purpose() -> VlanPurpose {
        VlanPurpose::General
    }

    /// Attach a DHCP server.
    pub fn with_dhcp(mut self, dhcp: DhcpConfig) -> Self {
        self.dhcp = Some(dhcp);
        self
    }

    /// Set the purpose tag.
    pub fn with_purpose(mut self, purpose: VlanPurpose) -> Self {
        self.purpose = purpose;
        self
    }
}
