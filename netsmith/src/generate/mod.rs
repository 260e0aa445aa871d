//! Vendor generator plugins.
//!
//! Each vendor implements [`Generator`] and is resolved by
//! [`generator_for`] through a closed match over [`Vendor`] — adding a
//! vendor means adding a module and one match arm, no runtime reflection.
//!
//! Generators consume a config that has *already passed validation* and do
//! not re-validate. They are pure: the same config always renders
//! byte-identical artifacts. Section order is fixed and safety-relevant —
//! it mirrors the order in which directives are safe to apply live (WAN,
//! LAN, VLANs ascending, wireless by band, firewall/NAT, hardening last so
//! the operator's own management session survives the sequence).

pub mod vendors;

use std::fmt;

use indexmap::IndexMap;

use crate::error::GenerateError;
use crate::model::{NetworkConfig, Vendor};

/// One capability a config can demand of a vendor plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Wan,
    Lan,
    Vlans,
    Wireless,
    Firewall,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Wan => "wan",
            Feature::Lan => "lan",
            Feature::Vlans => "vlans",
            Feature::Wireless => "wireless",
            Feature::Firewall => "firewall",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named unit of generated configuration output.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Line-oriented command script.
    Text(String),
    /// Structured payload (UniFi controller import).
    Json(serde_json::Value),
}

impl Artifact {
    /// Render to the exact bytes that would be written or deployed.
    /// JSON objects serialize with sorted keys, so rendering is stable.
    pub fn render(&self) -> String {
        match self {
            Artifact::Text(text) => text.clone(),
            Artifact::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Command lines to send for this artifact, comments and blanks dropped.
    /// JSON artifacts have no line-oriented form.
    pub fn command_lines(&self) -> Vec<String> {
        match self {
            Artifact::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from)
                .collect(),
            Artifact::Json(_) => vec![],
        }
    }
}

/// Named artifacts in apply order.
pub type ArtifactMap = IndexMap<String, Artifact>;

/// Contract each vendor plugin implements.
pub trait Generator: Send + Sync {
    /// The vendor this plugin targets.
    fn vendor(&self) -> Vendor;

    /// Capabilities this plugin can render.
    fn supported_features(&self) -> &'static [Feature];

    /// Render artifacts for a validated config.
    ///
    /// Precondition: `config` passed [`crate::validate::validate`] with
    /// `is_valid = true`. Fails with [`GenerateError::UnsupportedFeature`]
    /// when the config demands a capability this vendor lacks — deploying a
    /// config that silently dropped a requested section is more dangerous
    /// than failing loudly here.
    fn generate(&self, config: &NetworkConfig) -> Result<ArtifactMap, GenerateError>;
}

/// Capabilities a config actually demands.
pub fn required_features(config: &NetworkConfig) -> Vec<Feature> {
    let mut required = vec![Feature::Wan, Feature::Lan, Feature::Firewall];
    if !config.vlans.is_empty() {
        required.push(Feature::Vlans);
    }
    if !config.wireless.is_empty() {
        required.push(Feature::Wireless);
    }
    required
}

/// Reject configs demanding capabilities the plugin does not have.
/// Called first by every `generate` implementation.
pub(crate) fn ensure_supported(
    generator: &dyn Generator,
    config: &NetworkConfig,
) -> Result<(), GenerateError> {
    for feature in required_features(config) {
        if !generator.supported_features().contains(&feature) {
            return Err(GenerateError::UnsupportedFeature {
                vendor: generator.vendor(),
                feature: feature.to_string(),
            });
        }
    }
    Ok(())
}

/// Resolve the plugin for a vendor. SonicWall generation is staged and not
/// yet implemented.
pub fn generator_for(vendor: Vendor) -> Result<&'static dyn Generator, GenerateError> {
    static MIKROTIK: vendors::mikrotik::MikrotikGenerator = vendors::mikrotik::MikrotikGenerator;
    static EDGEROUTER: vendors::edgerouter::EdgerouterGenerator =
        vendors::edgerouter::EdgerouterGenerator;
    static UNIFI: vendors::unifi::UnifiGenerator = vendors::unifi::UnifiGenerator;

    match vendor {
        Vendor::Mikrotik => Ok(&MIKROTIK),
        Vendor::Edgerouter => Ok(&EDGEROUTER),
        Vendor::Unifi => Ok(&UNIFI),
        Vendor::Sonicwall => Err(GenerateError::UnsupportedVendor { vendor }),
    }
}

/// Generate artifacts for a validated config, dispatching on its vendor.
pub fn generate(config: &NetworkConfig) -> Result<ArtifactMap, GenerateError> {
    generator_for(config.vendor)?.generate(config)
}

/// Builder for line-oriented command scripts with commented sections.
#[derive(Debug, Default)]
pub(crate) struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a commented section.
    pub fn section(&mut self, title: &str) {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(format!("# {title}"));
    }

    /// Append one command line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Finish, yielding a text artifact.
    pub fn into_artifact(self) -> Artifact {
        Artifact::Text(self.lines.join("\n") + "\n")
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::model::{
        DeploymentType, DhcpConfig, LanConfig, SecurityConfig, VlanConfig, VlanPurpose, WanConfig,
        WirelessConfig,
    };

    /// A combined deployment touching every generator section.
    pub(crate) fn sample_config(vendor: Vendor) -> NetworkConfig {
        NetworkConfig::new(
            vendor,
            DeploymentType::Combined,
            WanConfig::static_addr(
                "ether1",
                "203.0.113.10",
                29,
                "203.0.113.9",
                vec!["9.9.9.9".into()],
            ),
            LanConfig::new("bridge-lan", "192.168.1.1", 24)
                .with_dhcp(DhcpConfig::new("192.168.1.100", "192.168.1.200")),
            SecurityConfig::new("admin", "s3cure-Pa55")
                .with_allowlist(vec!["192.168.1.0/24".into()])
                .harden_services(),
        )
        .with_vlan(
            VlanConfig::new(20, "guest", "10.0.20.0/24")
                .with_dhcp(DhcpConfig::new("10.0.20.100", "10.0.20.200"))
                .with_purpose(VlanPurpose::Guest),
        )
        .with_vlan(VlanConfig::new(10, "mgmt", "10.0.10.0/24"))
        .with_wireless(WirelessConfig::wpa2("corp", "hunter2hunter2").with_vlan(10))
    }
}
