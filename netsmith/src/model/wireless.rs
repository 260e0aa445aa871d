//! Wireless network configuration.

use serde::{Deserialize, Serialize};

/// Wireless security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WirelessSecurity {
    Open,
    Wpa2Psk,
    Wpa3Psk,
}

/// Radio band/generation. Generators group wireless blocks by band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// 2.4 GHz legacy band.
    Legacy,
    /// 5 GHz high-throughput band.
    HighThroughput,
}

/// One wireless network (SSID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirelessConfig {
    /// Network name.
    pub ssid: String,

    /// Security mode.
    pub security: WirelessSecurity,

    /// Passphrase. Meaningless for `Open`; required otherwise.
    #[serde(default)]
    pub passphrase: Option<String>,

    /// VLAN the SSID is bridged into. Must reference an existing
    /// `VlanConfig.id`; the validation engine rejects dangling references.
    #[serde(default)]
    pub vlan_id: Option<u16>,

    /// Radio band.
    pub band: Band,

    /// Guest network flag (client isolation on vendors that support it).
    #[serde(default)]
    pub guest: bool,
}

impl WirelessConfig {
    /// WPA2-PSK network on the legacy band.
    pub fn wpa2(ssid: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            security: WirelessSecurity::Wpa2Psk,
            passphrase: Some(passphrase.into()),
            vlan_id: None,
            band: Band::Legacy,
            guest: false,
        }
    }

    /// Bind the SSID to a VLAN.
    pub fn with_vlan(mut self, vlan_id: u16) -> Self {
        self.vlan_id = Some(vlan_id);
        self
    }

    /// Set the radio band.
    pub fn with_band(mut self, band: Band) -> Self {
        self.band = band;
        self
    }

    /// Mark as a guest network.
    pub fn guest(mut self) -> Self {
        self.guest = true;
        self
    }
}
