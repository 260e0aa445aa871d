//! Address syntax validation.
//!
//! Every check takes the dotted field path it is validating so the problem
//! it records carries that path and a corrective example, rather than a
//! bare parser error.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use super::{Problems, ValidationErrorKind};

/// Parse an IPv4 address, recording a problem on failure.
pub fn parse_ipv4(field: &str, value: &str, problems: &mut Problems) -> Option<Ipv4Addr> {
    match value.parse::<Ipv4Addr>() {
        Ok(addr) => Some(addr),
        Err(_) => {
            problems.push_suggesting(
                ValidationErrorKind::InvalidAddress,
                field,
                value,
                "not a valid IPv4 address",
                "use format 192.168.1.1",
            );
            None
        }
    }
}

/// Parse a CIDR network, recording a problem on failure.
pub fn parse_cidr(field: &str, value: &str, problems: &mut Problems) -> Option<Ipv4Network> {
    match value.parse::<Ipv4Network>() {
        Ok(net) => Some(net),
        Err(_) => {
            problems.push_suggesting(
                ValidationErrorKind::InvalidCidr,
                field,
                value,
                "not a valid CIDR network",
                "use format 192.168.1.0/24",
            );
            None
        }
    }
}

/// Check a prefix length, recording a problem when out of range.
pub fn check_prefix(field: &str, prefix: u8, problems: &mut Problems) -> bool {
    if prefix > 32 {
        problems.push_suggesting(
            ValidationErrorKind::InvalidPrefix,
            field,
            prefix.to_string(),
            "prefix length must be between 0 and 32",
            "use a value like 24",
        );
        return false;
    }
    true
}

/// Build the subnet from a host address and prefix, recording a problem when
/// the pair does not form a network.
pub fn subnet_of(
    field: &str,
    address: Ipv4Addr,
    prefix: u8,
    problems: &mut Problems,
) -> Option<Ipv4Network> {
    match Ipv4Network::new(address, prefix) {
        Ok(net) => Some(net),
        Err(_) => {
            problems.push(
                ValidationErrorKind::InvalidPrefix,
                field,
                format!("{address}/{prefix}"),
                "address and prefix do not form a valid network",
            );
            None
        }
    }
}
