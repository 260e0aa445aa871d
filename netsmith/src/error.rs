//! Error types for netsmith.
//!
//! Validation problems are deliberately *not* here: they are values
//! (`validate::ValidationError`) returned in batch, never raised. Everything
//! that can abort an operation lives in the layered enums below.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::deploy::SessionState;
use crate::model::Vendor;

/// Main error type for netsmith operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Artifact generation errors
    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Deployment session errors
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),
}

/// Artifact generation errors.
///
/// Generation fails loudly and completely: a config that asks for a
/// capability the vendor plugin does not support is rejected before any
/// artifact is produced, never silently truncated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// No generator exists for this vendor yet.
    #[error("No generator implemented for vendor '{vendor}'")]
    UnsupportedVendor { vendor: Vendor },

    /// The config requires a feature the vendor plugin does not support.
    #[error("Vendor '{vendor}' does not support required feature '{feature}'")]
    UnsupportedFeature { vendor: Vendor, feature: String },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key changed since it was last recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host key unknown under strict verification
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts file problem
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether a connect retry could plausibly succeed.
    ///
    /// Authentication and host-key failures are input errors: retrying with
    /// the same credentials can only fail again, so they are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. }
                | TransportError::Timeout(_)
                | TransportError::Disconnected
                | TransportError::Io(_)
        )
    }
}

/// Command channel errors (remote execution, prompt detection).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open the session channel
    #[error("Failed to open session channel")]
    OpenFailed,

    /// Prompt not seen before the deadline
    #[error("Prompt not found within {0:?}")]
    PromptTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid prompt pattern
    #[error("Invalid prompt pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The device reported a command failure
    #[error("Device rejected command '{command}': {output}")]
    CommandRejected { command: String, output: String },
}

/// Deployment session errors.
///
/// Each failure mode is a distinct variant so callers can react differently:
/// connection errors were already retried, authentication errors must not be
/// retried, backup failures abort before mutation, apply/verify failures
/// have triggered rollback, and rollback failures require manual recovery.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Connection could not be established within the attempt ceiling.
    #[error("Connection to '{target}' failed after {attempts} attempt(s): {source}")]
    Connection {
        target: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Authentication was rejected. Never retried.
    #[error("Authentication rejected by '{target}' for user '{user}'")]
    Authentication { target: String, user: String },

    /// Backup could not be captured; nothing was applied.
    #[error("Backup of '{target}' failed before any change was made: {message}")]
    Backup { target: String, message: String },

    /// An artifact failed to apply.
    #[error("Apply failed on artifact '{artifact}': {message}")]
    Apply { artifact: String, message: String },

    /// Post-apply verification found drift from the intended config.
    #[error("Verification found {} drift item(s)", findings.len())]
    Verify { findings: Vec<Drift> },

    /// Rollback itself failed. The device may be half-configured; the
    /// backup at `backup` is the manual recovery point. Never auto-retried.
    #[error("ROLLBACK FAILED on '{target}': {message}; restore manually from {backup:?}")]
    RollbackFailed {
        target: String,
        backup: PathBuf,
        message: String,
    },

    /// An operation was invoked in a state that does not permit it.
    #[error("Illegal session transition: {from:?} -> {to:?}")]
    IllegalTransition { from: SessionState, to: SessionState },

    /// Another session already holds the lock for this device.
    #[error("Device '{target}' is locked by another deployment session")]
    DeviceBusy { target: String },

    /// Deployment over SSH is not available for this vendor.
    #[error("No deployment profile for vendor '{vendor}'")]
    UnsupportedVendor { vendor: Vendor },

    /// A remote step exceeded its deadline.
    #[error("Deployment step timed out after {0:?}")]
    Timeout(Duration),
}

/// One verification mismatch between intended and observed device state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    /// What was being checked (e.g. "wan.address").
    pub field: String,
    /// The value the config intended.
    pub expected: String,
    /// What the probe observed, as far as it could tell.
    pub observed: String,
}

impl std::fmt::Display for Drift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: expected '{}', device reports '{}'",
            self.field, self.expected, self.observed
        )
    }
}

/// Result type alias using netsmith's Error.
pub type Result<T> = std::result::Result<T, Error>;
