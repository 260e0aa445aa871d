//! Vendor-agnostic data model for a complete network configuration.
//!
//! These are pure value types: construction enforces shape only (required
//! sub-objects, field types), never semantics. Semantic rules live in
//! [`crate::validate`] so that a reader can build a config from
//! partially-wrong input and still get every problem reported in one pass.

mod lan;
mod security;
mod vlan;
mod wan;
mod wireless;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use lan::{DhcpConfig, LanConfig};
pub use security::SecurityConfig;
pub use vlan::{VlanConfig, VlanPurpose};
pub use wan::{WanConfig, WanMode};
pub use wireless::{Band, WirelessConfig, WirelessSecurity};

/// Supported device vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// MikroTik RouterOS (SSH, text script)
    Mikrotik,
    /// SonicWall (generation staged, not yet implemented)
    Sonicwall,
    /// Ubiquiti UniFi (controller JSON payloads)
    Unifi,
    /// Ubiquiti EdgeRouter EdgeOS (SSH, set-command script)
    Edgerouter,
}

impl Vendor {
    /// Canonical lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Mikrotik => "mikrotik",
            Vendor::Sonicwall => "sonicwall",
            Vendor::Unifi => "unifi",
            Vendor::Edgerouter => "edgerouter",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of deployment this config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentType {
    RouterOnly,
    ApOnly,
    Combined,
    Firewall,
}

/// Customer metadata. Descriptive only; no invariants attach to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub site: String,
    pub contact: String,
}

/// Root aggregate describing one complete network configuration.
///
/// Built once per invocation by an external reader, validated, handed to a
/// generator, and discarded. Generators never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Target vendor; selects the generator plugin.
    pub vendor: Vendor,

    /// Device model string (e.g. "RB4011", "ER-4"). Informational.
    pub device_model: String,

    /// Customer metadata.
    #[serde(default)]
    pub customer: CustomerInfo,

    /// Deployment type.
    pub deployment_type: DeploymentType,

    /// WAN interface configuration.
    pub wan: WanConfig,

    /// LAN/bridge configuration.
    pub lan: LanConfig,

    /// VLANs, in reader order. Generators emit them in ascending id order.
    #[serde(default)]
    pub vlans: Vec<VlanConfig>,

    /// Wireless networks.
    #[serde(default)]
    pub wireless: Vec<WirelessConfig>,

    /// Security hardening settings.
    pub security: SecurityConfig,

    /// Opaque vendor-specific extension fields, preserved in reader order.
    #[serde(default)]
    pub vendor_extensions: IndexMap<String, String>,
}

impl NetworkConfig {
    /// Create a config with the required sub-objects and empty lists.
    pub fn new(
        vendor: Vendor,
        deployment_type: DeploymentType,
        wan: WanConfig,
        lan: LanConfig,
        security: SecurityConfig,
    ) -> Self {
        Self {
            vendor,
            device_model: String::new(),
            customer: CustomerInfo::default(),
            deployment_type,
            wan,
            lan,
            vlans: vec![],
            wireless: vec![],
            security,
            vendor_extensions: IndexMap::new(),
        }
    }

    /// Set the device model string.
    pub fn with_device_model(mut self, model: impl Into<String>) -> Self {
        self.device_model = model.into();
        self
    }

    /// Set customer metadata.
    pub fn with_customer(mut self, customer: CustomerInfo) -> Self {
        self.customer = customer;
        self
    }

    /// Add a VLAN.
    pub fn with_vlan(mut self, vlan: VlanConfig) -> Self {
        self.vlans.push(vlan);
        self
    }

    /// Add a wireless network.
    pub fn with_wireless(mut self, wireless: WirelessConfig) -> Self {
        self.wireless.push(wireless);
        self
    }

    /// Add a vendor-specific extension field.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vendor_extensions.insert(key.into(), value.into());
        self
    }

    /// Look up a VLAN by id.
    pub fn vlan_by_id(&self, id: u16) -> Option<&VlanConfig> {
        self.vlans.iter().find(|v| v.id == id)
    }

    /// VLANs in ascending id order, the order generators emit them.
    pub fn vlans_ordered(&self) -> Vec<&VlanConfig> {
        let mut ordered: Vec<&VlanConfig> = self.vlans.iter().collect();
        ordered.sort_by_key(|v| v.id);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_names_round_trip() {
        for vendor in [
            Vendor::Mikrotik,
            Vendor::Sonicwall,
            Vendor::Unifi,
            Vendor::Edgerouter,
        ] {
            let json = serde_json::to_string(&vendor).unwrap();
            assert_eq!(json, format!("\"{}\"", vendor.as_str()));
            let back: Vendor = serde_json::from_str(&json).unwrap();
            assert_eq!(back, vendor);
        }
    }

    #[test]
    fn test_vlans_ordered_sorts_by_id() {
        let config = NetworkConfig::new(
            Vendor::Mikrotik,
            DeploymentType::Combined,
            WanConfig::dhcp("ether1"),
            LanConfig::new("bridge-lan", "192.168.1.1", 24),
            SecurityConfig::new("admin", "s3cure-Pa55"),
        )
        .with_vlan(VlanConfig::new(30, "iot", "10.0.30.0/24"))
        .with_vlan(VlanConfig::new(10, "mgmt", "10.0.10.0/24"));

        let ids: Vec<u16> = config.vlans_ordered().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![10, 30]);
        // reader order is preserved on the struct itself
        assert_eq!(config.vlans[0].id, 30);
    }

    #[test]
    fn test_vlan_by_id() {
        let config = NetworkConfig::new(
            Vendor::Unifi,
            DeploymentType::Combined,
            WanConfig::dhcp("eth0"),
            LanConfig::new("br0", "192.168.1.1", 24),
            SecurityConfig::new("admin", "s3cure-Pa55"),
        )
        .with_vlan(VlanConfig::new(20, "guest", "10.0.20.0/24"));

        assert!(config.vlan_by_id(20).is_some());
        assert!(config.vlan_by_id(99).is_none());
    }
}
