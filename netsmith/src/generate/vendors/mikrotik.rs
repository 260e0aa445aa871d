//! MikroTik RouterOS generator.
//!
//! Produces RouterOS command scripts in `/export`-compatible form, split
//! into three artifacts:
//! - `router` — WAN, LAN bridge with DHCP, VLAN interfaces with DHCP
//! - `wireless` — security profiles and wlan interfaces, grouped by band
//! - `firewall` — NAT, guest/IoT isolation, then hardening (account,
//!   service disablement, management allowlist) last
//!
//! Applied over SSH line by line, so section order within each artifact
//! matches the safe live-apply order.

use crate::error::GenerateError;
use crate::generate::{Artifact, ArtifactMap, Feature, Generator, Script, ensure_supported};
use crate::model::{Band, NetworkConfig, Vendor, WanMode, WirelessSecurity};

use super::{lan_network_str, vlan_gateway_cidr, vlan_gateway_str};

/// MikroTik RouterOS plugin.
pub struct MikrotikGenerator;

const FEATURES: &[Feature] = &[
    Feature::Wan,
    Feature::Lan,
    Feature::Vlans,
    Feature::Wireless,
    Feature::Firewall,
];

impl Generator for MikrotikGenerator {
    fn vendor(&self) -> Vendor {
        Vendor::Mikrotik
    }

    fn supported_features(&self) -> &'static [Feature] {
        FEATURES
    }

    fn generate(&self, config: &NetworkConfig) -> Result<ArtifactMap, GenerateError> {
        ensure_supported(self, config)?;

        let mut artifacts = ArtifactMap::new();
        artifacts.insert("router".to_string(), router_artifact(config));
        if !config.wireless.is_empty() {
            artifacts.insert("wireless".to_string(), wireless_artifact(config));
        }
        artifacts.insert("firewall".to_string(), firewall_artifact(config));
        Ok(artifacts)
    }
}

fn router_artifact(config: &NetworkConfig) -> Artifact {
    let mut script = Script::new();
    let wan = &config.wan;

    script.section(&format!("WAN ({})", wan.interface));
    match wan.mode {
        WanMode::Static => {
            script.push(format!(
                "/ip address add address={}/{} interface={} comment=\"wan\"",
                wan.address.as_deref().unwrap_or(""),
                wan.prefix.unwrap_or(0),
                wan.interface,
            ));
            script.push(format!(
                "/ip route add dst-address=0.0.0.0/0 gateway={}",
                wan.gateway.as_deref().unwrap_or(""),
            ));
            if !wan.dns.is_empty() {
                script.push(format!("/ip dns set servers={}", wan.dns.join(",")));
            }
        }
        WanMode::Dhcp => {
            script.push(format!(
                "/ip dhcp-client add interface={} disabled=no",
                wan.interface
            ));
        }
        WanMode::Pppoe => {
            script.push(format!(
                "/interface pppoe-client add name=pppoe-wan interface={} user={} password={} \
                 add-default-route=yes disabled=no",
                wan.interface,
                wan.pppoe_username.as_deref().unwrap_or(""),
                wan.pppoe_password.as_deref().unwrap_or(""),
            ));
        }
    }

    let lan = &config.lan;
    script.section(&format!("LAN ({})", lan.interface));
    script.push(format!("/interface bridge add name={}", lan.interface));
    script.push(format!(
        "/ip address add address={}/{} interface={}",
        lan.address, lan.prefix, lan.interface
    ));
    if let Some(dhcp) = &lan.dhcp {
        push_dhcp_server(&mut script, "lan", &lan.interface, &lan_network_str(lan), &lan.address, dhcp);
    }

    for vlan in config.vlans_ordered() {
        let ifname = vlan_interface(vlan.id, &vlan.name);
        script.section(&format!("VLAN {} ({})", vlan.id, vlan.name));
        script.push(format!(
            "/interface vlan add name={} interface={} vlan-id={}",
            ifname, lan.interface, vlan.id
        ));
        script.push(format!(
            "/ip address add address={} interface={}",
            vlan_gateway_cidr(vlan),
            ifname
        ));
        if let Some(dhcp) = &vlan.dhcp {
            let network = vlan
                .subnet
                .parse::<ipnetwork::Ipv4Network>()
                .map(|net| format!("{}/{}", net.network(), net.prefix()))
                .unwrap_or_else(|_| vlan.subnet.clone());
            push_dhcp_server(
                &mut script,
                &format!("vlan{}", vlan.id),
                &ifname,
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
    interface: &str,
    network: &str,
    gateway: &str,
    dhcp: &crate::model::DhcpConfig,
) {
    script.push(format!(
        "/ip pool add name=pool-{} ranges={}-{}",
        name, dhcp.pool_start, dhcp.pool_end
    ));
    script.push(format!(
        "/ip dhcp-server add name=dhcp-{} interface={} address-pool=pool-{} lease-time={}s disabled={}",
        name,
        interface,
        name,
        dhcp.lease_seconds,
        if dhcp.enabled { "no" } else { "yes" },
    ));
    let mut network_line = format!(
        "/ip dhcp-server network add address={network} gateway={gateway}"
    );
    if !dhcp.dns.is_empty() {
        network_line.push_str(&format!(" dns-server={}", dhcp.dns.join(",")));
    }
    script.push(network_line);
}

fn wireless_artifact(config: &NetworkConfig) -> Artifact {
    let mut script = Script::new();

    // Grouped by band, legacy radio first.
    for (band, title, band_arg) in [
        (Band::Legacy, "Wireless - 2.4 GHz", "2ghz-b/g/n"),
        (Band::HighThroughput, "Wireless - 5 GHz", "5ghz-a/n/ac"),
    ] {
        let networks: Vec<_> = config.wireless.iter().filter(|w| w.band == band).collect();
        if networks.is_empty() {
            continue;
        }
        script.section(title);
        for wifi in networks {
            let profile = match wifi.security {
                WirelessSecurity::Open => "default".to_string(),
                WirelessSecurity::Wpa2Psk | WirelessSecurity::Wpa3Psk => {
                    let name = format!("sp-{}", slug(&wifi.ssid));
                    let auth = match wifi.security {
                        WirelessSecurity::Wpa2Psk => "wpa2-psk",
                        _ => "wpa3-psk",
                    };
                    script.push(format!(
                        "/interface wireless security-profiles add name={} mode=dynamic-keys \
                         authentication-types={} wpa2-pre-shared-key={}",
                        name,
                        auth,
                        wifi.passphrase.as_deref().unwrap_or(""),
                    ));
                    name
                }
            };

            let mut line = format!(
                "/interface wireless add name=wlan-{} ssid=\"{}\" band={} security-profile={} disabled=no",
                slug(&wifi.ssid),
                wifi.ssid,
                band_arg,
                profile,
            );
            if let Some(vlan_id) = wifi.vlan_id {
                line.push_str(&format!(" vlan-mode=use-tag vlan-id={vlan_id}"));
            }
            if wifi.guest {
                line.push_str(" default-forwarding=no");
            }
            script.push(line);
        }
    }

    script.into_artifact()
}

fn firewall_artifact(config: &NetworkConfig) -> Artifact {
    let mut script = Script::new();

    script.section("NAT");
    script.push(format!(
        "/ip firewall nat add chain=srcnat out-interface={} action=masquerade comment=\"wan nat\"",
        config.wan.interface
    ));

    script.section("Filter");
    script.push(
        "/ip firewall filter add chain=forward connection-state=established,related action=accept",
    );
    script.push("/ip firewall filter add chain=forward connection-state=invalid action=drop");
    for vlan in config.vlans_ordered() {
        if vlan.purpose.is_isolated() {
            script.push(format!(
                "/ip firewall filter add chain=forward in-interface={} out-interface={} \
                 action=drop comment=\"isolate {}\"",
                vlan_interface(vlan.id, &vlan.name),
                config.lan.interface,
                vlan.name,
            ));
        }
    }

    // Hardening goes last so the management session survives the apply.
    let security = &config.security;
    script.section("Hardening");
    script.push(format!(
        "/user add name={} password={} group=full",
        security.admin_username, security.admin_password
    ));
    if security.disable_unused_services {
        for service in ["telnet", "ftp", "www", "api"] {
            script.push(format!("/ip service disable {service}"));
        }
    }
    if !security.management_allowlist.is_empty() {
        let allow = security.management_allowlist.join(",");
        script.push(format!("/ip service set ssh address={allow}"));
        script.push(format!("/ip service set winbox address={allow}"));
    }

    script.into_artifact()
}

fn vlan_interface(id: u16, name: &str) -> String {
    format!("vlan{}-{}", id, slug(name))
}

/// Lowercased, with anything outside [a-z0-9-] squashed to '-'.
fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::testutil::sample_config;
    use crate::model::WirelessConfig;

    fn rendered(config: &NetworkConfig) -> ArtifactMap {
        MikrotikGenerator.generate(config).unwrap()
    }

    fn line_pos(text: &str, needle: &str) -> usize {
        text.lines()
            .position(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("'{needle}' not found in:\n{text}"))
    }

    #[test]
    fn test_artifact_names_in_apply_order() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let names: Vec<&String> = artifacts.keys().collect();
        assert_eq!(names, vec!["router", "wireless", "firewall"]);
    }

    #[test]
    fn test_router_sections_ordered_wan_lan_vlans_ascending() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let text = artifacts["router"].render();

        let wan = line_pos(&text, "/ip address add address=203.0.113.10/29");
        let lan = line_pos(&text, "/interface bridge add name=bridge-lan");
        let vlan10 = line_pos(&text, "vlan-id=10");
        let vlan20 = line_pos(&text, "vlan-id=20");
        assert!(wan < lan && lan < vlan10 && vlan10 < vlan20);
    }

    #[test]
    fn test_static_wan_renders_route_and_dns() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let text = artifacts["router"].render();
        assert!(text.contains("/ip route add dst-address=0.0.0.0/0 gateway=203.0.113.9"));
        assert!(text.contains("/ip dns set servers=9.9.9.9"));
    }

    #[test]
    fn test_dhcp_wan_renders_client() {
        let mut config = sample_config(Vendor::Mikrotik);
        config.wan = crate::model::WanConfig::dhcp("ether1");
        let text = rendered(&config)["router"].render();
        assert!(text.contains("/ip dhcp-client add interface=ether1 disabled=no"));
        assert!(!text.contains("/ip route add"));
    }

    #[test]
    fn test_lan_dhcp_server_block() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let text = artifacts["router"].render();
        assert!(text.contains("/ip pool add name=pool-lan ranges=192.168.1.100-192.168.1.200"));
        assert!(text.contains(
            "/ip dhcp-server add name=dhcp-lan interface=bridge-lan address-pool=pool-lan"
        ));
        assert!(text.contains("/ip dhcp-server network add address=192.168.1.0/24 gateway=192.168.1.1"));
    }

    #[test]
    fn test_vlan_address_is_first_usable_host() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let text = artifacts["router"].render();
        assert!(text.contains("/ip address add address=10.0.20.1/24 interface=vlan20-guest"));
    }

    #[test]
    fn test_wireless_grouped_by_band() {
        let mut config = sample_config(Vendor::Mikrotik);
        config.wireless.push(
            WirelessConfig::wpa2("corp5", "hunter2hunter2").with_band(Band::HighThroughput),
        );
        let text = rendered(&config)["wireless"].render();

        let legacy = line_pos(&text, "band=2ghz-b/g/n");
        let modern = line_pos(&text, "band=5ghz-a/n/ac");
        assert!(legacy < modern);
    }

    #[test]
    fn test_guest_vlan_isolated_in_firewall() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let text = artifacts["firewall"].render();
        assert!(text.contains("in-interface=vlan20-guest"));
        assert!(text.contains("action=drop comment=\"isolate guest\""));
        // management VLAN is not isolated
        assert!(!text.contains("vlan10-mgmt out-interface"));
    }

    #[test]
    fn test_hardening_is_last() {
        let artifacts = rendered(&sample_config(Vendor::Mikrotik));
        let text = artifacts["firewall"].render();

        let nat = line_pos(&text, "action=masquerade");
        let user = line_pos(&text, "/user add name=admin");
        let services = line_pos(&text, "/ip service disable telnet");
        let allowlist = line_pos(&text, "/ip service set ssh address=192.168.1.0/24");
        assert!(nat < user && user < services && services < allowlist);
    }
}
