//! Topology validation: DHCP pools, VLAN identity and subnet layout,
//! wireless-to-VLAN references.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use super::address;
use super::{Problems, ValidationErrorKind, ValidationPolicy};
use crate::model::{DhcpConfig, VlanConfig, WirelessConfig};

/// Highest assignable 802.1Q id.
pub const VLAN_ID_MAX: u16 = 4094;

/// Check one DHCP pool against its enclosing subnet and gateway.
///
/// `field` is the path prefix of the DHCP block (e.g. "lan.dhcp"). A
/// reversed pool is reported once, on `<field>.pool`, and suppresses the
/// containment checks — they would only restate the same mistake.
pub fn check_dhcp_pool(
    field: &str,
    subnet: Ipv4Network,
    gateway: Ipv4Addr,
    dhcp: &DhcpConfig,
    problems: &mut Problems,
) {
    let start = address::parse_ipv4(&format!("{field}.pool_start"), &dhcp.pool_start, problems);
    let end = address::parse_ipv4(&format!("{field}.pool_end"), &dhcp.pool_end, problems);

    for (i, dns) in dhcp.dns.iter().enumerate() {
        address::parse_ipv4(&format!("{field}.dns[{i}]"), dns, problems);
    }

    let (Some(start), Some(end)) = (start, end) else {
        return;
    };

    if u32::from(start) > u32::from(end) {
        problems.push_suggesting(
            ValidationErrorKind::InvalidPoolRange,
            format!("{field}.pool"),
            format!("{}-{}", dhcp.pool_start, dhcp.pool_end),
            "pool start is after pool end",
            "swap the pool boundaries",
        );
        return;
    }

    for (name, addr) in [("pool_start", start), ("pool_end", end)] {
        if !subnet.contains(addr) {
            problems.push(
                ValidationErrorKind::PoolOutsideSubnet,
                format!("{field}.{name}"),
                addr.to_string(),
                format!("address lies outside subnet {subnet}"),
            );
        }
    }

    if u32::from(start) <= u32::from(gateway) && u32::from(gateway) <= u32::from(end) {
        problems.push_suggesting(
            ValidationErrorKind::GatewayInsidePool,
            format!("{field}.pool"),
            format!("{}-{}", dhcp.pool_start, dhcp.pool_end),
            format!("gateway {gateway} falls inside the pool"),
            "start the pool above the gateway address",
        );
    }
}

/// Check VLAN id range, uniqueness and reservation policy.
pub fn check_vlan_ids(vlans: &[VlanConfig], policy: &ValidationPolicy, problems: &mut Problems) {
    let mut seen: HashSet<u16> = HashSet::new();

    for (i, vlan) in vlans.iter().enumerate() {
        let field = format!("vlans[{i}].id");

        if vlan.id == 0 || vlan.id > VLAN_ID_MAX {
            problems.push_suggesting(
                ValidationErrorKind::VlanIdOutOfRange,
                &field,
                vlan.id.to_string(),
                "VLAN id must be between 1 and 4094",
                "use an id like 10",
            );
        }

        if policy.reserved_vlan_ids.contains(&vlan.id) {
            problems.push(
                ValidationErrorKind::ReservedVlanId,
                &field,
                vlan.id.to_string(),
                format!("VLAN id {} is reserved by policy", vlan.id),
            );
        }

        if !seen.insert(vlan.id) {
            problems.push(
                ValidationErrorKind::DuplicateVlanId,
                &field,
                vlan.id.to_string(),
                format!("VLAN id {} is already in use", vlan.id),
            );
        }
    }
}

/// Check that VLAN subnets are mutually disjoint and disjoint from the LAN.
///
/// Takes already-parsed subnets so syntax problems (reported by the address
/// layer) are not double-counted here. Each tuple is (index, id, subnet).
pub fn check_subnet_disjointness(
    lan_subnet: Option<Ipv4Network>,
    vlan_subnets: &[(usize, u16, Ipv4Network)],
    problems: &mut Problems,
) {
    for (pos, &(i, id, net)) in vlan_subnets.iter().enumerate() {
        if let Some(lan) = lan_subnet {
            if lan.overlaps(net) {
                problems.push(
                    ValidationErrorKind::OverlappingSubnets,
                    format!("vlans[{i}].subnet"),
                    net.to_string(),
                    format!("VLAN {id} subnet overlaps the LAN subnet {lan}"),
                );
            }
        }

        for &(j, other_id, other) in &vlan_subnets[pos + 1..] {
            if net.overlaps(other) {
                problems.push(
                    ValidationErrorKind::OverlappingSubnets,
                    format!("vlans[{j}].subnet"),
                    other.to_string(),
                    format!("VLAN {other_id} subnet overlaps VLAN {id} subnet {net}"),
                );
            }
        }
    }
}

/// Check that every wireless VLAN binding resolves to a configured VLAN.
pub fn check_wireless_refs(
    wireless: &[WirelessConfig],
    vlans: &[VlanConfig],
    problems: &mut Problems,
) {
    let known: HashSet<u16> = vlans.iter().map(|v| v.id).collect();

    for (i, wifi) in wireless.iter().enumerate() {
        if let Some(vlan_id) = wifi.vlan_id {
            if !known.contains(&vlan_id) {
                problems.push_suggesting(
                    ValidationErrorKind::DanglingVlanReference,
                    format!("wireless[{i}].vlan_id"),
                    vlan_id.to_string(),
                    format!("SSID '{}' references VLAN {vlan_id}, which does not exist", wifi.ssid),
                    "add the VLAN or drop the binding",
                );
            }
        }
    }
}
