//! Ubiquiti UniFi generator.
//!
//! UniFi devices are configured through a controller, not a CLI, so the
//! artifacts here are structured JSON payloads in the controller's REST
//! shapes rather than command scripts:
//! - `networks` — WAN settings plus LAN and VLAN network definitions
//! - `wlans` — SSID definitions, grouped by band
//! - `firewall` — isolation rules and hardening, hardening entries last
//!
//! Payload field names follow the controller's `networkconf`/`wlanconf`
//! REST objects. JSON objects serialize with sorted keys, so repeated
//! generation from the same config is byte-identical.

use serde_json::{Value, json};

use crate::error::GenerateError;
use crate::generate::{Artifact, ArtifactMap, Feature, Generator, ensure_supported};
use crate::model::{Band, NetworkConfig, Vendor, WanMode, WirelessSecurity};

use super::{lan_network_str, vlan_gateway_cidr};

/// Ubiquiti UniFi controller plugin.
pub struct UnifiGenerator;

const FEATURES: &[Feature] = &[
    Feature::Wan,
    Feature::Lan,
    Feature::Vlans,
    Feature::Wireless,
    Feature::Firewall,
];

impl Generator for UnifiGenerator {
    fn vendor(&self) -> Vendor {
        Vendor::Unifi
    }

    fn supported_features(&self) -> &'static [Feature] {
        FEATURES
    }

    fn generate(&self, config: &NetworkConfig) -> Result<ArtifactMap, GenerateError> {
        ensure_supported(self, config)?;

        let mut artifacts = ArtifactMap::new();
        artifacts.insert("networks".to_string(), Artifact::Json(networks_payload(config)));
        if !config.wireless.is_empty() {
            artifacts.insert("wlans".to_string(), Artifact::Json(wlans_payload(config)));
        }
        artifacts.insert("firewall".to_string(), Artifact::Json(firewall_payload(config)));
        Ok(artifacts)
    }
}

fn networks_payload(config: &NetworkConfig) -> Value {
    let mut networks: Vec<Value> = Vec::new();

    // WAN first: apply order matches the safe live sequence.
    let wan = &config.wan;
    let mut wan_obj = json!({
        "name": "WAN",
        "purpose": "wan",
        "wan_networkgroup": "WAN",
        "wan_interface": wan.interface,
    });
    match wan.mode {
        WanMode::Static => {
            wan_obj["wan_type"] = json!("static");
            wan_obj["wan_ip"] = json!(wan.address.as_deref().unwrap_or(""));
            wan_obj["wan_netmask_prefix"] = json!(wan.prefix.unwrap_or(0));
            wan_obj["wan_gateway"] = json!(wan.gateway.as_deref().unwrap_or(""));
            wan_obj["wan_dns"] = json!(wan.dns);
        }
        WanMode::Dhcp => {
            wan_obj["wan_type"] = json!("dhcp");
        }
        WanMode::Pppoe => {
            wan_obj["wan_type"] = json!("pppoe");
            wan_obj["wan_username"] = json!(wan.pppoe_username.as_deref().unwrap_or(""));
            wan_obj["x_wan_password"] = json!(wan.pppoe_password.as_deref().unwrap_or(""));
        }
    }
    networks.push(wan_obj);

    // LAN (the untagged corporate network).
    let lan = &config.lan;
    let mut lan_obj = json!({
        "name": "LAN",
        "purpose": "corporate",
        "ip_subnet": format!("{}/{}", lan.address, lan.prefix),
        "vlan_enabled": false,
        "dhcpd_enabled": false,
    });
    if let Some(dhcp) = &lan.dhcp {
        fill_dhcp(&mut lan_obj, dhcp);
    }
    networks.push(lan_obj);

    // VLANs in ascending id order.
    for vlan in config.vlans_ordered() {
        let mut vlan_obj = json!({
            "name": vlan.name,
            "purpose": if vlan.purpose.is_isolated() { "guest" } else { "corporate" },
            "ip_subnet": vlan_gateway_cidr(vlan),
            "vlan_enabled": true,
            "vlan": vlan.id,
            "dhcpd_enabled": false,
        });
        if let Some(dhcp) = &vlan.dhcp {
            fill_dhcp(&mut vlan_obj, dhcp);
        }
        networks.push(vlan_obj);
    }

    json!({ "networks": networks })
}

fn fill_dhcp(network: &mut Value, dhcp: &crate::model::DhcpConfig) {
    network["dhcpd_enabled"] = json!(dhcp.enabled);
    network["dhcpd_start"] = json!(dhcp.pool_start);
    network["dhcpd_stop"] = json!(dhcp.pool_end);
    network["dhcpd_leasetime"] = json!(dhcp.lease_seconds);
    for (i, dns) in dhcp.dns.iter().take(4).enumerate() {
        network[format!("dhcpd_dns_{}", i + 1)] = json!(dns);
    }
    if !dhcp.dns.is_empty() {
        network["dhcpd_dns_enabled"] = json!(true);
    }
}

fn wlans_payload(config: &NetworkConfig) -> Value {
    let mut wlans: Vec<Value> = Vec::new();

    // Grouped by band, legacy first.
    for (band, band_str) in [(Band::Legacy, "2g"), (Band::HighThroughput, "5g")] {
        for wifi in config.wireless.iter().filter(|w| w.band == band) {
            let security = match wifi.security {
                WirelessSecurity::Open => "open",
                WirelessSecurity::Wpa2Psk => "wpapsk",
                WirelessSecurity::Wpa3Psk => "wpa3",
            };
            let mut wlan = json!({
                "name": wifi.ssid,
                "enabled": true,
                "security": security,
                "wlan_band": band_str,
                "is_guest": wifi.guest,
            });
            if let Some(psk) = &wifi.passphrase {
                wlan["x_passphrase"] = json!(psk);
            }
            if let Some(vlan_id) = wifi.vlan_id {
                wlan["vlan_enabled"] = json!(true);
                wlan["vlan"] = json!(vlan_id);
            }
            wlans.push(wlan);
        }
    }

    json!({ "wlans": wlans })
}

fn firewall_payload(config: &NetworkConfig) -> Value {
    let mut rules: Vec<Value> = Vec::new();

    let mut index = 2000;
    for vlan in config.vlans_ordered() {
        if !vlan.purpose.is_isolated() {
            continue;
        }
        rules.push(json!({
            "name": format!("isolate-{}", vlan.name),
            "ruleset": "LAN_IN",
            "rule_index": index,
            "action": "drop",
            "src_networkconf": vlan.name,
            "dst_address": lan_network_str(&config.lan),
            "enabled": true,
        }));
        index += 10;
    }

    // Hardening entries last in the payload's apply list.
    let security = &config.security;
    let mut hardening = json!({
        "admin_username": security.admin_username,
        "x_admin_password": security.admin_password,
        "disable_unused_services": security.disable_unused_services,
    });
    if !security.management_allowlist.is_empty() {
        hardening["mgmt_allowlist"] = json!(security.management_allowlist);
    }

    json!({
        "firewall_rules": rules,
        "hardening": hardening,
    })
}
