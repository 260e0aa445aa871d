//! Deployment engine: push generated artifacts to a live device.
//!
//! Every deployment runs as a [`DeploymentSession`] state machine with a
//! mandatory backup before the first mutating command, post-apply
//! verification, and automatic rollback on failure. A session covers one
//! attempt against one device and is never reused.

mod backup;
mod lock;
mod profile;
mod session;

pub use backup::BackupArtifact;
pub use lock::DeviceLock;
pub use profile::{DeviceProfile, VerifyProbe};
pub use session::{DeploymentSession, SessionBuilder, SessionOptions, dry_run};

use std::fmt;

/// Lifecycle state of a deployment session.
///
/// The happy path runs left to right; error edges lead to `RollingBack`
/// once anything has been applied, and to `Failed` before that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Authenticated,
    BackingUp,
    Applying,
    Verifying,
    Complete,
    RollingBack,
    RolledBack,
    Failed,
}

impl SessionState {
    /// Whether moving from `self` to `to` is a legal edge.
    ///
    /// `Authenticated -> Applying` is the unbacked-apply override edge and
    /// is only taken when the caller explicitly opted in.
    pub fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Connecting)
                | (Connecting, Authenticated)
                | (Connecting, Failed)
                | (Authenticated, BackingUp)
                | (Authenticated, Applying)
                | (Authenticated, Failed)
                | (BackingUp, Applying)
                | (BackingUp, Failed)
                | (Applying, Verifying)
                | (Applying, RollingBack)
                | (Applying, Failed)
                | (Verifying, Complete)
                | (Verifying, RollingBack)
                | (Verifying, Failed)
                | (RollingBack, RolledBack)
                | (RollingBack, Failed)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::RolledBack | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Authenticated => "authenticated",
            SessionState::BackingUp => "backing-up",
            SessionState::Applying => "applying",
            SessionState::Verifying => "verifying",
            SessionState::Complete => "complete",
            SessionState::RollingBack => "rolling-back",
            SessionState::RolledBack => "rolled-back",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}
