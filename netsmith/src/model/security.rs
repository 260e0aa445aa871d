//! Security hardening settings.

use serde::{Deserialize, Serialize};

/// Admin account, management-plane allowlist and service hardening.
///
/// Generators emit these directives *last* so the operator's own management
/// session is not locked out before the rest of the config is in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Admin username.
    pub admin_username: String,

    /// Admin password. Strength is enforced by the validation engine, not
    /// at construction.
    pub admin_password: String,

    /// CIDR blocks permitted to reach management services (SSH, web UI).
    /// Empty means unrestricted.
    #[serde(default)]
    pub management_allowlist: Vec<String>,

    /// Disable management services the deployment does not use
    /// (telnet, ftp, plain-http API and the like).
    #[serde(default)]
    pub disable_unused_services: bool,
}

impl SecurityConfig {
    pub fn new(admin_username: impl Into<String>, admin_password: impl Into<String>) -> Self {
        Self {
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            management_allowlist: vec![],
            disable_unused_services: false,
        }
    }

    /// Restrict management access to the given CIDR blocks.
    pub fn with_allowlist(mut self, cidrs: Vec<String>) -> Self {
        self.management_allowlist = cidrs;
        self
    }

    /// Disable unused management services.
    pub fn harden_services(mut self) -> Self {
        self.disable_unused_services = true;
        self
    }
}
