//! Whole-tree validation: orchestrates the address and topology layers
//! across a complete [`NetworkConfig`] and adds the mode-dependent and
//! policy checks that only make sense at the tree level.

use ipnetwork::Ipv4Network;

use super::{Problems, ValidationErrorKind, ValidationPolicy, address, topology};
use crate::model::{NetworkConfig, WanConfig, WanMode, WirelessSecurity};

/// Run every check over the whole config, accumulating into `problems`.
pub fn check_config(config: &NetworkConfig, policy: &ValidationPolicy, problems: &mut Problems) {
    check_wan(&config.wan, problems);

    // LAN address, prefix and DHCP
    let lan_addr = address::parse_ipv4("lan.address", &config.lan.address, problems);
    let lan_prefix_ok = address::check_prefix("lan.prefix", config.lan.prefix, problems);

    let lan_subnet = match (lan_addr, lan_prefix_ok) {
        (Some(addr), true) => address::subnet_of("lan", addr, config.lan.prefix, problems),
        _ => None,
    };

    if let (Some(dhcp), Some(subnet), Some(gateway)) = (&config.lan.dhcp, lan_subnet, lan_addr) {
        topology::check_dhcp_pool("lan.dhcp", subnet, gateway, dhcp, problems);
    }

    // VLAN identity
    topology::check_vlan_ids(&config.vlans, policy, problems);

    // VLAN subnets and their DHCP servers
    let mut vlan_subnets: Vec<(usize, u16, Ipv4Network)> = Vec::new();
    for (i, vlan) in config.vlans.iter().enumerate() {
        let Some(net) = address::parse_cidr(&format!("vlans[{i}].subnet"), &vlan.subnet, problems)
        else {
            continue;
        };
        vlan_subnets.push((i, vlan.id, net));

        if let Some(dhcp) = &vlan.dhcp {
            // The device takes the first usable host as the VLAN gateway.
            if let Some(gateway) = net.nth(1) {
                topology::check_dhcp_pool(&format!("vlans[{i}].dhcp"), net, gateway, dhcp, problems);
            }
        }
    }
    topology::check_subnet_disjointness(lan_subnet, &vlan_subnets, problems);

    // Wireless references and passphrases
    topology::check_wireless_refs(&config.wireless, &config.vlans, problems);
    for (i, wifi) in config.wireless.iter().enumerate() {
        if wifi.security == WirelessSecurity::Open {
            continue;
        }
        match &wifi.passphrase {
            None => problems.push(
                ValidationErrorKind::MissingField,
                format!("wireless[{i}].passphrase"),
                "",
                format!("SSID '{}' uses PSK security but has no passphrase", wifi.ssid),
            ),
            Some(psk) if psk.len() < 8 || psk.len() > 63 => problems.push_suggesting(
                ValidationErrorKind::WeakPassword,
                format!("wireless[{i}].passphrase"),
                psk.clone(),
                "WPA passphrase must be 8-63 characters",
                "use at least 8 characters",
            ),
            Some(_) => {}
        }
    }

    // Security hardening
    check_admin_password(&config.security.admin_password, problems);
    for (i, cidr) in config.security.management_allowlist.iter().enumerate() {
        address::parse_cidr(&format!("security.management_allowlist[{i}]"), cidr, problems);
    }
}

/// WAN mode decides which fields are mandatory. Static fields under DHCP
/// are an error, not silently ignored: the operator asked for something the
/// device would never do.
fn check_wan(wan: &WanConfig, problems: &mut Problems) {
    match wan.mode {
        WanMode::Static => {
            if let Some(address) = &wan.address {
                address::parse_ipv4("wan.address", address, problems);
            } else {
                missing(problems, "wan.address", "static WAN requires an address");
            }

            match wan.prefix {
                Some(prefix) => {
                    address::check_prefix("wan.prefix", prefix, problems);
                }
                None => missing(problems, "wan.prefix", "static WAN requires a prefix length"),
            }

            if let Some(gateway) = &wan.gateway {
                address::parse_ipv4("wan.gateway", gateway, problems);
            } else {
                missing(problems, "wan.gateway", "static WAN requires a gateway");
            }

            if wan.dns.is_empty() {
                missing(problems, "wan.dns", "static WAN requires at least one DNS server");
            } else {
                for (i, dns) in wan.dns.iter().enumerate() {
                    address::parse_ipv4(&format!("wan.dns[{i}]"), dns, problems);
                }
            }
        }

        WanMode::Dhcp => {
            for (field, present) in [
                ("wan.address", wan.address.is_some()),
                ("wan.prefix", wan.prefix.is_some()),
                ("wan.gateway", wan.gateway.is_some()),
                ("wan.dns", !wan.dns.is_empty()),
            ] {
                if present {
                    problems.push_suggesting(
                        ValidationErrorKind::UnexpectedField,
                        field,
                        "",
                        "static addressing field set while WAN mode is dhcp",
                        "remove the field or switch the mode to static",
                    );
                }
            }
        }

        WanMode::Pppoe => {
            if wan.pppoe_username.is_none() {
                missing(problems, "wan.pppoe_username", "PPPoE WAN requires a username");
            }
            if wan.pppoe_password.is_none() {
                missing(problems, "wan.pppoe_password", "PPPoE WAN requires a password");
            }
            if wan.has_static_fields() {
                problems.push(
                    ValidationErrorKind::UnexpectedField,
                    "wan",
                    "",
                    "static addressing fields set while WAN mode is pppoe",
                );
            }
        }
    }
}

/// Admin password: at least 8 characters, with at least one letter and one
/// digit.
fn check_admin_password(password: &str, problems: &mut Problems) {
    let long_enough = password.len() >= 8;
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(long_enough && has_letter && has_digit) {
        problems.push_suggesting(
            ValidationErrorKind::WeakPassword,
            "security.admin_password",
            "********",
            "admin password must be at least 8 characters and mix letters and digits",
            "use a longer password with letters and digits",
        );
    }
}

fn missing(problems: &mut Problems, field: &str, message: &str) {
    problems.push(ValidationErrorKind::MissingField, field, "", message);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{
        DeploymentType, DhcpConfig, LanConfig, SecurityConfig, Vendor, VlanConfig, WanConfig,
        WirelessConfig,
    };
    use crate::validate::{validate, validate_with_policy};

    /// The calibration scenario: static WAN 203.0.113.10/29 with gateway
    /// 203.0.113.9, LAN 192.168.1.1/24 with pool .100-.200.
    fn calibration_config() -> NetworkConfig {
        NetworkConfig::new(
            Vendor::Mikrotik,
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
            SecurityConfig::new("admin", "s3cure-Pa55"),
        )
    }

    #[test]
    fn test_calibration_scenario_is_valid() {
        let result = validate(&calibration_config());
        assert!(result.is_valid, "{result}");
        assert_eq!(result.errors, vec![]);
    }

    #[test]
    fn test_reversed_pool_is_exactly_one_error_on_lan_dhcp_pool() {
        let mut config = calibration_config();
        config.lan.dhcp = Some(DhcpConfig::new("192.168.1.250", "192.168.1.100"));

        let result = validate(&config);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::InvalidPoolRange);
        assert_eq!(result.errors[0].field, "lan.dhcp.pool");
    }

    #[test]
    fn test_duplicate_vlan_does_not_stop_later_checks() {
        let mut config = calibration_config();
        config.vlans = vec![
            VlanConfig::new(20, "guest", "10.0.20.0/24"),
            VlanConfig::new(20, "guest2", "10.0.21.0/24"),
        ];
        // An unrelated problem further down the tree: weak admin password.
        config.security.admin_password = "short".into();

        let result = validate(&config);
        assert!(!result.is_valid);
        assert_eq!(result.of_kind(ValidationErrorKind::DuplicateVlanId).len(), 1);
        // Batch property: the duplicate did not stop password checking.
        assert_eq!(result.of_kind(ValidationErrorKind::WeakPassword).len(), 1);
    }

    #[test]
    fn test_dangling_wireless_vlan_caught_in_validation() {
        let mut config = calibration_config();
        config.wireless = vec![WirelessConfig::wpa2("corp", "hunter2hunter2").with_vlan(99)];

        let result = validate(&config);
        assert!(!result.is_valid);
        let refs = result.of_kind(ValidationErrorKind::DanglingVlanReference);
        assert_eq!(refs.len(), 1);
        assert!(refs[0].message.contains("99"));
    }

    #[test]
    fn test_static_fields_under_dhcp_mode_are_errors() {
        let mut config = calibration_config();
        config.wan = WanConfig::dhcp("ether1");
        config.wan.address = Some("203.0.113.10".into());
        config.wan.gateway = Some("203.0.113.9".into());

        let result = validate(&config);
        assert!(!result.is_valid);
        assert_eq!(result.of_kind(ValidationErrorKind::UnexpectedField).len(), 2);
    }

    #[test]
    fn test_static_mode_missing_fields_all_reported() {
        let mut config = calibration_config();
        config.wan = WanConfig {
            interface: "ether1".into(),
            mode: WanMode::Static,
            address: None,
            prefix: None,
            gateway: None,
            dns: vec![],
            pppoe_username: None,
            pppoe_password: None,
        };

        let result = validate(&config);
        // All four missing fields in one pass, not just the first.
        assert_eq!(result.of_kind(ValidationErrorKind::MissingField).len(), 4);
    }

    #[test]
    fn test_pppoe_requires_credentials() {
        let mut config = calibration_config();
        config.wan = WanConfig::pppoe("ether1", "user", "pass");
        config.wan.pppoe_password = None;

        let result = validate(&config);
        let missing = result.of_kind(ValidationErrorKind::MissingField);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].field, "wan.pppoe_password");
    }

    #[test]
    fn test_vlan_dhcp_checked_against_vlan_subnet() {
        let mut config = calibration_config();
        config.vlans = vec![
            VlanConfig::new(20, "guest", "10.0.20.0/24")
                .with_dhcp(DhcpConfig::new("10.0.99.10", "10.0.99.50")),
        ];

        let result = validate(&config);
        let outside = result.of_kind(ValidationErrorKind::PoolOutsideSubnet);
        assert_eq!(outside.len(), 2);
        assert!(outside[0].field.starts_with("vlans[0].dhcp"));
    }

    #[test]
    fn test_management_allowlist_syntax() {
        let mut config = calibration_config();
        config.security.management_allowlist =
            vec!["10.0.0.0/24".into(), "not-a-cidr".into()];

        let result = validate(&config);
        let bad = result.of_kind(ValidationErrorKind::InvalidCidr);
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].field, "security.management_allowlist[1]");
    }

    #[test]
    fn test_reserved_vlan_id_policy_applied() {
        let mut config = calibration_config();
        config.vlans = vec![VlanConfig::new(1, "native", "10.0.1.0/24")];

        let policy = ValidationPolicy {
            reserved_vlan_ids: vec![1],
        };
        let result = validate_with_policy(&config, &policy);
        assert_eq!(result.of_kind(ValidationErrorKind::ReservedVlanId).len(), 1);

        // Default policy reserves nothing.
        assert!(validate(&config).is_valid);
    }

    #[test]
    fn test_display_lists_every_error() {
        let mut config = calibration_config();
        config.lan.address = "not-an-ip".into();
        config.security.admin_password = "weak".into();

        let result = validate(&config);
        let rendered = result.to_string();
        assert!(rendered.contains("lan.address"));
        assert!(rendered.contains("security.admin_password"));
    }
}
