//! Per-vendor device command profiles.
//!
//! A profile captures how one vendor's CLI is driven: the prompt to wait
//! for, the export command used for backups, the wrapper commands around an
//! apply, the restore sequence, and the strings that mark a rejected
//! command. Only the SSH-reachable vendors have profiles; UniFi is
//! controller-provisioned and SonicWall has no generator yet, so both are
//! rejected up front.

use crate::error::DeployError;
use crate::model::{NetworkConfig, Vendor, WanMode};

/// How to drive one vendor's CLI during deployment.
#[derive(Debug)]
pub struct DeviceProfile {
    pub vendor: Vendor,

    /// Regex matched against the buffer tail to detect the prompt.
    pub prompt_pattern: &'static str,

    /// Command whose output is the configuration backup.
    pub export_command: &'static str,

    /// Commands run after the export to snapshot the running config on the
    /// device itself, for vendors whose restore loads a device-side file.
    pub snapshot_commands: &'static [&'static str],

    /// Commands run before replaying the export during rollback. These
    /// remove the objects this tool creates (by its fixed naming
    /// conventions) so a partial apply does not collide with the replay.
    pub pre_restore_commands: &'static [&'static str],

    /// Commands sent before the first artifact line.
    pub apply_prelude: &'static [&'static str],

    /// Commands sent after the last artifact line.
    pub apply_epilogue: &'static [&'static str],

    /// Output substrings that mark a rejected command.
    pub failure_patterns: &'static [&'static str],
}

/// Device-side snapshot EdgeOS rollback loads. `load` replaces the whole
/// candidate config, which a line-by-line replay cannot do.
const EDGEOS_SNAPSHOT: &str = "/config/netsmith-rollback.boot";

static MIKROTIK: DeviceProfile = DeviceProfile {
    vendor: Vendor::Mikrotik,
    // "[admin@gw] > " with optional safe-mode marker.
    prompt_pattern: r"\[[^\]]+\] >\s*$",
    export_command: "/export",
    snapshot_commands: &[],
    // Names and comments here match what the RouterOS generator emits.
    pre_restore_commands: &[
        "/ip firewall nat remove [find where comment=\"wan nat\"]",
        "/ip firewall filter remove [find where comment~\"^isolate\"]",
        "/ip dhcp-server remove [find where name~\"^dhcp-\"]",
        "/ip pool remove [find where name~\"^pool-\"]",
        "/interface wireless remove [find where name~\"^wlan-\"]",
        "/interface wireless security-profiles remove [find where name~\"^sp-\"]",
        "/interface vlan remove [find where name~\"^vlan[0-9]+-\"]",
    ],
    apply_prelude: &[],
    apply_epilogue: &[],
    failure_patterns: &[
        "bad command name",
        "syntax error",
        "input does not match any value of",
        "failure:",
    ],
};

static EDGEROUTER: DeviceProfile = DeviceProfile {
    vendor: Vendor::Edgerouter,
    prompt_pattern: r"[$#]\s*$",
    export_command: "show configuration commands",
    snapshot_commands: &["configure", "save /config/netsmith-rollback.boot", "exit"],
    pre_restore_commands: &[],
    apply_prelude: &["configure"],
    apply_epilogue: &["commit", "save", "exit"],
    failure_patterns: &["Invalid command", "Commit failed", "Set failed", "Error:"],
};

impl DeviceProfile {
    /// Look up the profile for a vendor.
    pub fn for_vendor(vendor: Vendor) -> Result<&'static DeviceProfile, DeployError> {
        match vendor {
            Vendor::Mikrotik => Ok(&MIKROTIK),
            Vendor::Edgerouter => Ok(&EDGEROUTER),
            Vendor::Unifi | Vendor::Sonicwall => Err(DeployError::UnsupportedVendor { vendor }),
        }
    }

    /// Failure patterns as owned strings for the command channel.
    pub fn failure_patterns_owned(&self) -> Vec<String> {
        self.failure_patterns.iter().map(|p| p.to_string()).collect()
    }

    /// The full command sequence that restores a captured backup.
    ///
    /// RouterOS first removes the objects this tool creates (matched by
    /// the generator's naming conventions), then replays the export body.
    /// Objects a failed apply created *outside* those conventions are not
    /// removed. EdgeOS loads the device-side snapshot taken during backup,
    /// which replaces the candidate config wholesale.
    pub fn restore_commands(&self, backup: &str) -> Vec<String> {
        let mut commands: Vec<String> =
            self.apply_prelude.iter().map(|c| c.to_string()).collect();
        commands.extend(self.pre_restore_commands.iter().map(|c| c.to_string()));
        match self.vendor {
            Vendor::Mikrotik => {
                commands.extend(
                    backup
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                        .map(str::to_string),
                );
            }
            Vendor::Edgerouter => commands.push(format!("load {EDGEOS_SNAPSHOT}")),
            Vendor::Unifi | Vendor::Sonicwall => {}
        }
        commands.extend(self.apply_epilogue.iter().map(|c| c.to_string()));
        commands
    }

    /// Structural spot-checks comparing device state against the intended
    /// config. Designed to catch gross failures cheaply, not to diff the
    /// whole configuration.
    pub fn verify_probes(&self, config: &NetworkConfig) -> Vec<VerifyProbe> {
        let mut probes = Vec::new();
        match self.vendor {
            Vendor::Mikrotik => {
                if config.wan.mode == WanMode::Static
                    && let (Some(address), Some(prefix)) = (&config.wan.address, config.wan.prefix)
                {
                    probes.push(VerifyProbe {
                        field: "wan.address".to_string(),
                        command: format!(
                            "/ip address print where interface={}",
                            config.wan.interface
                        ),
                        expect: format!("{address}/{prefix}"),
                    });
                }
                probes.push(VerifyProbe {
                    field: "lan.address".to_string(),
                    command: format!(
                        "/ip address print where interface={}",
                        config.lan.interface
                    ),
                    expect: config.lan.cidr(),
                });
                for (i, vlan) in config.vlans_ordered().into_iter().enumerate() {
                    probes.push(VerifyProbe {
                        field: format!("vlans[{i}].id"),
                        command: format!("/interface vlan print where vlan-id={}", vlan.id),
                        expect: vlan.id.to_string(),
                    });
                }
            }
            Vendor::Edgerouter => {
                if config.wan.mode == WanMode::Static
                    && let (Some(address), Some(prefix)) = (&config.wan.address, config.wan.prefix)
                {
                    probes.push(VerifyProbe {
                        field: "wan.address".to_string(),
                        command: "show configuration commands".to_string(),
                        expect: format!(
                            "set interfaces ethernet {} address {address}/{prefix}",
                            config.wan.interface
                        ),
                    });
                }
                probes.push(VerifyProbe {
                    field: "lan.address".to_string(),
                    command: "show configuration commands".to_string(),
                    expect: format!(
                        "set interfaces ethernet {} address {}",
                        config.lan.interface,
                        config.lan.cidr()
                    ),
                });
                for (i, vlan) in config.vlans_ordered().into_iter().enumerate() {
                    probes.push(VerifyProbe {
                        field: format!("vlans[{i}].id"),
                        command: "show configuration commands".to_string(),
                        expect: format!("vif {}", vlan.id),
                    });
                }
            }
            Vendor::Unifi | Vendor::Sonicwall => {}
        }
        probes
    }
}

/// One verification command and the substring its output must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyProbe {
    /// Config field being checked (e.g. "wan.address").
    pub field: String,
    /// Command to run on the device.
    pub command: String,
    /// Substring the output must contain for the check to pass.
    pub expect: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::testutil::sample_config;

    #[test]
    fn test_unifi_and_sonicwall_have_no_profile() {
        for vendor in [Vendor::Unifi, Vendor::Sonicwall] {
            let err = DeviceProfile::for_vendor(vendor).unwrap_err();
            assert!(matches!(err, DeployError::UnsupportedVendor { vendor: v } if v == vendor));
        }
    }

    #[test]
    fn test_mikrotik_restore_removes_own_objects_then_replays() {
        let profile = DeviceProfile::for_vendor(Vendor::Mikrotik).unwrap();
        let backup = "# RouterOS export\n\n/ip address\nadd address=192.168.1.1/24\n";
        let commands = profile.restore_commands(backup);

        let replay = commands.iter().position(|c| c == "/ip address").unwrap();
        assert!(replay > 0, "cleanup must precede the replay");
        assert!(commands[..replay].iter().all(|c| c.contains("remove [find")));
        assert_eq!(&commands[replay..], &["/ip address", "add address=192.168.1.1/24"]);
    }

    #[test]
    fn test_edgerouter_restore_loads_device_snapshot() {
        let profile = DeviceProfile::for_vendor(Vendor::Edgerouter).unwrap();
        let commands = profile.restore_commands("set system host-name gw\n");
        assert_eq!(
            commands,
            vec![
                "configure",
                "load /config/netsmith-rollback.boot",
                "commit",
                "save",
                "exit"
            ]
        );
    }

    #[test]
    fn test_edgerouter_snapshot_and_restore_agree_on_file() {
        let profile = DeviceProfile::for_vendor(Vendor::Edgerouter).unwrap();
        assert!(
            profile
                .snapshot_commands
                .iter()
                .any(|c| c.contains(EDGEOS_SNAPSHOT)),
            "backup must save the file that rollback loads"
        );
    }

    #[test]
    fn test_mikrotik_probes_cover_wan_lan_vlans() {
        let profile = DeviceProfile::for_vendor(Vendor::Mikrotik).unwrap();
        let config = sample_config(Vendor::Mikrotik);
        let probes = profile.verify_probes(&config);

        let fields: Vec<&str> = probes.iter().map(|p| p.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["wan.address", "lan.address", "vlans[0].id", "vlans[1].id"]
        );
        assert_eq!(probes[0].expect, "203.0.113.10/29");
        assert_eq!(probes[1].expect, "192.168.1.1/24");
    }

    #[test]
    fn test_dhcp_wan_has_no_wan_probe() {
        let profile = DeviceProfile::for_vendor(Vendor::Edgerouter).unwrap();
        let mut config = sample_config(Vendor::Edgerouter);
        config.wan = crate::model::WanConfig::dhcp("eth0");
        config.wireless.clear();
        let probes = profile.verify_probes(&config);
        assert!(probes.iter().all(|p| p.field != "wan.address"));
    }
}
