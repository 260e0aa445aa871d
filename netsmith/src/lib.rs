//! # Netsmith
//!
//! Multi-vendor network device configuration generator and deployer.
//!
//! Netsmith turns one vendor-neutral [`model::NetworkConfig`] into
//! ready-to-apply configuration for MikroTik RouterOS, Ubiquiti EdgeRouter
//! and UniFi devices, and can push it to a live device over SSH with a
//! mandatory backup, post-apply verification, and automatic rollback.
//!
//! ## Features
//!
//! - Vendor-neutral data model covering WAN, LAN, VLANs, wireless and
//!   security hardening
//! - Batch validation: every problem in the config is reported at once,
//!   with field paths and corrective suggestions
//! - Deterministic generators per vendor; unsupported capabilities fail
//!   loudly before anything is produced
//! - Safety-first SSH deployment: backup before the first mutating
//!   command, structural verification after apply, rollback on any failure
//!
//! ## Quick Start
//!
//! ```rust
//! use netsmith::model::{
//!     DeploymentType, DhcpConfig, LanConfig, NetworkConfig, SecurityConfig, Vendor, WanConfig,
//! };
//!
//! let config = NetworkConfig::new(
//!     Vendor::Mikrotik,
//!     DeploymentType::RouterOnly,
//!     WanConfig::dhcp("ether1"),
//!     LanConfig::new("bridge-lan", "192.168.1.1", 24)
//!         .with_dhcp(DhcpConfig::new("192.168.1.100", "192.168.1.200")),
//!     SecurityConfig::new("admin", "s3cure-Pa55"),
//! );
//!
//! let report = netsmith::validate::validate(&config);
//! assert!(report.is_valid);
//!
//! let artifacts = netsmith::generate::generate(&config)?;
//! println!("{}", artifacts["router"].render());
//! # Ok::<(), netsmith::Error>(())
//! ```
//!
//! Deployment runs as a state machine over SSH; see
//! [`deploy::SessionBuilder`].

pub mod channel;
pub mod deploy;
pub mod error;
pub mod generate;
pub mod model;
pub mod transport;
pub mod validate;

// Re-export main types for convenience
pub use deploy::{DeploymentSession, SessionBuilder, SessionState};
pub use error::{DeployError, Error, GenerateError, Result};
pub use generate::{Artifact, ArtifactMap, Generator, generate, generator_for};
pub use model::{NetworkConfig, Vendor};
pub use transport::{AuthMethod, SshConfig};
pub use validate::{ValidationResult, validate};
