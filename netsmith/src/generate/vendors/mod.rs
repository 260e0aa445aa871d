//! Vendor plugin implementations.
//!
//! One module per vendor, each implementing [`crate::generate::Generator`].
//! SonicWall is staged for a future release and has no module yet.

pub mod edgerouter;
pub mod mikrotik;
pub mod unifi;

use ipnetwork::Ipv4Network;

use crate::model::{LanConfig, VlanConfig};

/// The LAN subnet in canonical network form ("192.168.1.0/24"), falling
/// back to the raw address/prefix when the caller skipped validation.
pub(crate) fn lan_network_str(lan: &LanConfig) -> String {
    lan.cidr()
        .parse::<Ipv4Network>()
        .map(|net| format!("{}/{}", net.network(), net.prefix()))
        .unwrap_or_else(|_| lan.cidr())
}

/// The device's own address on a VLAN: first usable host of the subnet.
pub(crate) fn vlan_gateway_str(vlan: &VlanConfig) -> String {
    vlan.subnet
        .parse::<Ipv4Network>()
        .ok()
        .and_then(|net| net.nth(1))
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| vlan.subnet.clone())
}

/// VLAN gateway with the subnet's prefix length ("10.0.20.1/24").
pub(crate) fn vlan_gateway_cidr(vlan: &VlanConfig) -> String {
    match vlan.subnet.parse::<Ipv4Network>() {
        Ok(net) => match net.nth(1) {
            Some(addr) => format!("{}/{}", addr, net.prefix()),
            None => vlan.subnet.clone(),
        },
        Err(_) => vlan.subnet.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_gateway_is_first_usable_host() {
        let vlan = VlanConfig::new(20, "guest", "10.0.20.0/24");
        assert_eq!(vlan_gateway_str(&vlan), "10.0.20.1");
        assert_eq!(vlan_gateway_cidr(&vlan), "10.0.20.1/24");
    }

    #[test]
    fn test_lan_network_masks_host_bits() {
        let lan = LanConfig::new("bridge-lan", "192.168.1.1", 24);
        assert_eq!(lan_network_str(&lan), "192.168.1.0/24");
    }
}
