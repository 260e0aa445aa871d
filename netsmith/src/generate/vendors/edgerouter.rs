//! Ubiquiti EdgeRouter (EdgeOS) generator.
//!
//! Produces EdgeOS `set` command scripts in two artifacts:
//! - `router` — WAN, LAN with DHCP, VLAN vifs with DHCP
//! - `firewall` — NAT masquerade, guest/IoT isolation rulesets, hardening
//!
//! EdgeRouters have no radios, so [`Feature::Wireless`] is absent from the
//! supported set: a config with wireless sections fails generation loudly
//! instead of silently losing its SSIDs.

use crate::error::GenerateError;
use crate::generate::{Artifact, ArtifactMap, Feature, Generator, Script, ensure_supported};
use crate::model::{NetworkConfig, Vendor, WanMode};

use super::{lan_network_str, vlan_gateway_cidr, vlan_gateway_str};

/// Ubiquiti EdgeRouter EdgeOS plugin.
pub struct EdgerouterGenerator;

const FEATURES: &[Feature] = &[
    Feature::Wan,
    Feature::Lan,
    Feature::Vlans,
    Feature::Firewall,
];

impl Generator for EdgerouterGenerator {
    fn vendor(&self) -> Vendor {
        Vendor::Edgerouter
    }

    fn supported_features(&self) -> &'static [Feature] {
        FEATURES
    }

    fn generate(&self, config: &NetworkConfig) -> Result<ArtifactMap, GenerateError> {
        ensure_supported(self, config)?;

        let mut artifacts = ArtifactMap::new();
        artifacts.insert("router".to_string(), router_artifact(config));
        artifacts.insert("firewall".to_string(), firewall_artifact(config));
        Ok(artifacts)
    }
}

fn router_artifact(config: &NetworkConfig) -> Artifact {
    let mut script = Script::new();
    let wan = &config.wan;

    script.section(&format!("WAN ({})", wan.interface));
    script.push(format!(
        "set interfaces ethernet {} description wan",
        wan.interface
    ));
    match wan.mode {
        WanMode::Static => {
            script.push(format!(
                "set interfaces ethernet {} address {}/{}",
                wan.interface,
                wan.address.as_deref().unwrap_or(""),
                wan.prefix.unwrap_or(0),
            ));
            script.push(format!(
                "set protocols static route 0.0.0.0/0 next-hop {}",
                wan.gateway.as_deref().unwrap_or(""),
            ));
            for dns in &wan.dns {
                script.push(format!("set system name-server {dns}"));
            }
        }
        WanMode::Dhcp => {
            script.push(format!(
                "set interfaces ethernet {} address dhcp",
                wan.interface
            ));
        }
        WanMode::Pppoe => {
            script.push(format!(
                "set interfaces ethernet {} pppoe 0 user-id {}",
                wan.interface,
                wan.pppoe_username.as_deref().unwrap_or(""),
            ));
            script.push(format!(
                "set interfaces ethernet {} pppoe 0 password {}",
                wan.interface,
                wan.pppoe_password.as_deref().unwrap_or(""),
            ));
            script.push(format!(
                "set interfaces ethernet {} pppoe 0 default-route auto",
                wan.interface
            ));
        }
    }

    let lan = &config.lan;
    script.section(&format!("LAN ({})", lan.interface));
    script.push(format!(
        "set interfaces ethernet {} address {}/{}",
        lan.interface, lan.address, lan.prefix
    ));
    script.push(format!(
        "set interfaces ethernet {} description lan",
        lan.interface
    ));
    if let Some(dhcp) = &lan.dhcp {
        push_dhcp_server(&mut script, "LAN", &lan_network_str(lan), &lan.address, dhcp);
    }

    for vlan in config.vlans_ordered() {
        script.section(&format!("VLAN {} ({})", vlan.id, vlan.name));
        script.push(format!(
            "set interfaces ethernet {} vif {} address {}",
            lan.interface,
            vlan.id,
            vlan_gateway_cidr(vlan),
        ));
        script.push(format!(
            "set interfaces ethernet {} vif {} description {}",
            lan.interface, vlan.id, vlan.name
        ));
        if let Some(dhcp) = &vlan.dhcp {
            let network = vlan
                .subnet
                .parse::<ipnetwork::Ipv4Network>()
                .map(|net| format!("{}/{}", net.network(), net.prefix()))
                .unwrap_or_else(|_| vlan.subnet.clone());
            push_dhcp_server(
                &mut script,
                &format!("VLAN{}", vlan.id),
                &network,
                &vlan_gateway_str(vlan),
                dhcp,
            );
        }
    }

    script.into_artifact()
}

fn push_dhcp_server(
    script: &mut Script,
    name: &str,
    network: &str,
    gateway: &str,
    dhcp: &crate::model::DhcpConfig,
) {
    let prefix = format!("set service dhcp-server shared-network-name {name} subnet {network}");
    script.push(format!("{prefix} start {} stop {}", dhcp.pool_start, dhcp.pool_end));
    script.push(format!("{prefix} default-router {gateway}"));
    script.push(format!("{prefix} lease {}", dhcp.lease_seconds));
    for dns in &dhcp.dns {
        script.push(format!("{prefix} dns-server {dns}"));
    }
    if !dhcp.enabled {
        script.push(format!(
            "set service dhcp-server shared-network-name {name} disable"
        ));
    }
}

fn firewall_artifact(config: &NetworkConfig) -> Artifact {
    let mut script = Script::new();

    script.section("NAT");
    script.push(format!(
        "set service nat rule 5010 outbound-interface {}",
        config.wan.interface
    ));
    script.push("set service nat rule 5010 type masquerade");
    script.push("set service nat rule 5010 description wan-nat");

    for vlan in config.vlans_ordered() {
        if !vlan.purpose.is_isolated() {
            continue;
        }
        let ruleset = format!("ISOLATE-{}", vlan.id);
        script.section(&format!("Isolation for VLAN {} ({})", vlan.id, vlan.name));
        script.push(format!("set firewall name {ruleset} default-action accept"));
        script.push(format!("set firewall name {ruleset} rule 10 action drop"));
        script.push(format!(
            "set firewall name {ruleset} rule 10 destination address {}",
            lan_network_str(&config.lan)
        ));
        script.push(format!(
            "set interfaces ethernet {} vif {} firewall in name {ruleset}",
            config.lan.interface, vlan.id
        ));
    }

    // Hardening last: the management session must survive the apply.
    let security = &config.security;
    script.section("Hardening");
    script.push(format!(
        "set system login user {} authentication plaintext-password '{}'",
        security.admin_username, security.admin_password
    ));
    script.push(format!(
        "set system login user {} level admin",
        security.admin_username
    ));
    if security.disable_unused_services {
        script.push("delete service telnet");
        script.push("delete service ubnt-discover");
        script.push("set service gui https-port 443");
        script.push("delete service gui http-port");
    }
    if !security.management_allowlist.is_empty() {
        for cidr in &security.management_allowlist {
            script.push(format!(
                "set firewall group network-group MGMT-ALLOW network {cidr}"
            ));
        }
        script.push("set firewall name MGMT-IN default-action drop");
        script.push(
            "set firewall name MGMT-IN rule 10 source group network-group MGMT-ALLOW",
        );
        script.push("set firewall name MGMT-IN rule 10 action accept");
    }

    script.into_artifact()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::testutil::sample_config;

    fn wireless_free_config() -> NetworkConfig {
        let mut config = sample_config(Vendor::Edgerouter);
        config.wireless.clear();
        config.wan.interface = "eth0".into();
        config.lan.interface = "eth1".into();
        config
    }

    #[test]
    fn test_wireless_config_fails_loudly() {
        let config = sample_config(Vendor::Edgerouter);
        let err = EdgerouterGenerator.generate(&config).unwrap_err();
        assert_eq!(
            err,
            GenerateError::UnsupportedFeature {
                vendor: Vendor::Edgerouter,
                feature: "wireless".to_string(),
            }
        );
    }

    #[test]
    fn test_artifact_names() {
        let artifacts = EdgerouterGenerator.generate(&wireless_free_config()).unwrap();
        let names: Vec<&String> = artifacts.keys().collect();
        assert_eq!(names, vec!["router", "firewall"]);
    }

    #[test]
    fn test_static_wan_set_commands() {
        let artifacts = EdgerouterGenerator.generate(&wireless_free_config()).unwrap();
        let text = artifacts["router"].render();
        assert!(text.contains("set interfaces ethernet eth0 address 203.0.113.10/29"));
        assert!(text.contains("set protocols static route 0.0.0.0/0 next-hop 203.0.113.9"));
        assert!(text.contains("set system name-server 9.9.9.9"));
    }

    #[test]
    fn test_vlan_vif_with_dhcp() {
        let artifacts = EdgerouterGenerator.generate(&wireless_free_config()).unwrap();
        let text = artifacts["router"].render();
        assert!(text.contains("set interfaces ethernet eth1 vif 20 address 10.0.20.1/24"));
        assert!(text.contains(
            "set service dhcp-server shared-network-name VLAN20 subnet 10.0.20.0/24 \
             start 10.0.20.100 stop 10.0.20.200"
        ));
    }

    #[test]
    fn test_guest_isolation_ruleset_attached_to_vif() {
        let artifacts = EdgerouterGenerator.generate(&wireless_free_config()).unwrap();
        let text = artifacts["firewall"].render();
        assert!(text.contains("set firewall name ISOLATE-20 rule 10 action drop"));
        assert!(text.contains("set interfaces ethernet eth1 vif 20 firewall in name ISOLATE-20"));
    }

    #[test]
    fn test_hardening_after_nat() {
        let artifacts = EdgerouterGenerator.generate(&wireless_free_config()).unwrap();
        let text = artifacts["firewall"].render();
        let nat = text.lines().position(|l| l.contains("type masquerade")).unwrap();
        let login = text
            .lines()
            .position(|l| l.contains("set system login user admin"))
            .unwrap();
        assert!(nat < login);
    }
}
