//! Deployment session state machine.
//!
//! One session covers one deployment attempt against one device. The
//! session is generic over [`DeviceChannel`] so the full
//! backup/apply/verify/rollback discipline is exercised in tests against a
//! scripted fake; [`SessionBuilder`] wires up the live SSH variant.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, error, info, warn};

use super::SessionState;
use super::backup::BackupArtifact;
use super::lock::DeviceLock;
use super::profile::DeviceProfile;
use crate::channel::{CommandChannel, DeviceChannel};
use crate::error::{DeployError, Drift, Error, TransportError};
use crate::generate::ArtifactMap;
use crate::model::{NetworkConfig, Vendor};
use crate::transport::{SshConfig, SshTransport};

/// How much probe output to keep in a drift report.
const DRIFT_OBSERVED_MAX: usize = 200;

/// Tunables for a deployment attempt.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Connection attempt ceiling. Only connection-class errors retry;
    /// authentication failures are fatal on the first attempt.
    pub connect_attempts: u32,

    /// Backoff before the second attempt; doubles each retry.
    pub initial_backoff: Duration,

    /// Deadline for each remote command.
    pub command_timeout: Duration,

    /// Directory backups are written to.
    pub backup_dir: PathBuf,

    /// Roll back automatically when apply or verify fails.
    pub auto_rollback: bool,

    /// Permit apply without a captured backup. Off by default; turning it
    /// on is logged loudly because rollback is impossible without a backup.
    pub allow_unbacked_apply: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            command_timeout: Duration::from_secs(30),
            backup_dir: PathBuf::from("backups"),
            auto_rollback: true,
            allow_unbacked_apply: false,
        }
    }
}

/// A single deployment attempt against one device.
///
/// Sessions are never reused: after reaching a terminal state
/// (`Complete`, `RolledBack`, `Failed`) every operation returns
/// [`DeployError::IllegalTransition`].
pub struct DeploymentSession<C: DeviceChannel> {
    target: String,
    profile: &'static DeviceProfile,
    options: SessionOptions,
    state: SessionState,
    // Both taken by the drop hook when a cancelled deployment hands them
    // to the background rollback task; `Some` for the session's lifetime
    // otherwise.
    channel: Option<C>,
    lock: Option<DeviceLock>,
    backup: Option<BackupArtifact>,
    applied: Vec<String>,
}

impl<C: DeviceChannel> fmt::Debug for DeploymentSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentSession")
            .field("target", &self.target)
            .field("state", &self.state)
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

impl DeploymentSession<CommandChannel> {
    /// Connect to a device over SSH with the default options.
    pub async fn connect(vendor: Vendor, ssh: SshConfig) -> Result<Self, DeployError> {
        SessionBuilder::new(vendor, ssh).connect().await
    }
}

impl<C: DeviceChannel> DeploymentSession<C> {
    /// Connect using a custom dialer. The dialer is invoked once per
    /// attempt; connection-class errors retry with doubling backoff up to
    /// the attempt ceiling, authentication failures never retry.
    ///
    /// Acquires the per-device lock first: a second session against the
    /// same target fails with [`DeployError::DeviceBusy`].
    pub async fn connect_with<F, Fut>(
        vendor: Vendor,
        target: &str,
        options: SessionOptions,
        mut dial: F,
    ) -> Result<Self, DeployError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<C, TransportError>>,
    {
        let profile = DeviceProfile::for_vendor(vendor)?;
        let lock = DeviceLock::try_acquire(target)?;
        debug!("session for {target}: idle -> connecting");

        let mut backoff = options.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match dial(attempt).await {
                Ok(channel) => {
                    info!("connected to {target} (attempt {attempt})");
                    return Ok(Self {
                        target: target.to_string(),
                        profile,
                        options,
                        state: SessionState::Authenticated,
                        channel: Some(channel),
                        lock: Some(lock),
                        backup: None,
                        applied: Vec::new(),
                    });
                }
                Err(TransportError::AuthenticationFailed { user }) => {
                    error!("authentication rejected by {target} for '{user}', not retrying");
                    return Err(DeployError::Authentication {
                        target: target.to_string(),
                        user,
                    });
                }
                Err(e) if e.is_retryable() && attempt < options.connect_attempts => {
                    warn!("connect to {target} failed (attempt {attempt}): {e}; retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    return Err(DeployError::Connection {
                        target: target.to_string(),
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Export the device configuration to a timestamped local file.
    ///
    /// Must succeed before [`apply`](Self::apply) unless
    /// `allow_unbacked_apply` is set. Failure leaves the session `Failed`
    /// with nothing applied.
    pub async fn backup(&mut self) -> Result<BackupArtifact, DeployError> {
        self.transition(SessionState::BackingUp)?;

        let export = match self.run_step(self.profile.export_command).await {
            Ok(output) => output,
            Err(message) => {
                self.transition(SessionState::Failed)?;
                return Err(DeployError::Backup {
                    target: self.target.clone(),
                    message,
                });
            }
        };

        // Device-side snapshot, for vendors whose restore loads a file.
        for command in self.profile.snapshot_commands {
            if let Err(message) = self.run_step(command).await {
                self.transition(SessionState::Failed)?;
                return Err(DeployError::Backup {
                    target: self.target.clone(),
                    message,
                });
            }
        }

        let artifact = match BackupArtifact::write(
            &self.options.backup_dir,
            &self.target,
            self.profile.vendor,
            &export,
        )
        .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                self.transition(SessionState::Failed)?;
                return Err(DeployError::Backup {
                    target: self.target.clone(),
                    message: e.to_string(),
                });
            }
        };

        self.backup = Some(artifact.clone());
        Ok(artifact)
    }

    /// Push artifacts in generation order.
    ///
    /// The applied-artifact cursor ([`applied`](Self::applied)) records how
    /// far the sequence got. Any failure triggers automatic rollback unless
    /// `auto_rollback` is off.
    pub async fn apply(&mut self, artifacts: &ArtifactMap) -> Result<(), DeployError> {
        if self.backup.is_none() {
            if !self.options.allow_unbacked_apply {
                return Err(DeployError::IllegalTransition {
                    from: self.state,
                    to: SessionState::Applying,
                });
            }
            warn!(
                "applying to {} WITHOUT a backup; rollback will be impossible",
                self.target
            );
        }
        self.transition(SessionState::Applying)?;

        for command in self.profile.apply_prelude {
            if let Err(message) = self.run_step(command).await {
                return Err(self.fail_with_rollback("prelude", message).await);
            }
        }

        for (name, artifact) in artifacts {
            debug!("applying artifact '{name}' to {}", self.target);
            for line in artifact.command_lines() {
                if let Err(message) = self.run_step(&line).await {
                    return Err(self.fail_with_rollback(name, message).await);
                }
            }
            self.applied.push(name.clone());
        }

        for command in self.profile.apply_epilogue {
            if let Err(message) = self.run_step(command).await {
                return Err(self.fail_with_rollback("epilogue", message).await);
            }
        }

        info!("applied {} artifact(s) to {}", self.applied.len(), self.target);
        Ok(())
    }

    /// Spot-check device state against the intended config.
    ///
    /// Catches gross failures (wrong IP applied, VLANs missing); any drift
    /// triggers rollback and is reported in full.
    pub async fn verify(&mut self, config: &NetworkConfig) -> Result<(), DeployError> {
        self.transition(SessionState::Verifying)?;

        let mut findings = Vec::new();
        for probe in self.profile.verify_probes(config) {
            match self.run_step(&probe.command).await {
                Ok(output) if output.contains(&probe.expect) => {}
                Ok(output) => findings.push(Drift {
                    field: probe.field,
                    expected: probe.expect,
                    observed: truncate(&output),
                }),
                Err(message) => findings.push(Drift {
                    field: probe.field,
                    expected: probe.expect,
                    observed: format!("probe failed: {message}"),
                }),
            }
        }

        if findings.is_empty() {
            self.transition(SessionState::Complete)?;
            info!("deployment to {} verified and complete", self.target);
            return Ok(());
        }

        warn!(
            "verification of {} found {} drift item(s)",
            self.target,
            findings.len()
        );
        Err(self
            .rollback_or_fail(DeployError::Verify { findings })
            .await)
    }

    /// Restore the device from the captured backup.
    ///
    /// EdgeOS restores load the device-side snapshot, replacing the config
    /// wholesale. RouterOS restores remove this tool's objects and replay
    /// the export; objects a failed apply created outside the generator's
    /// naming conventions survive the replay.
    ///
    /// Rollback failure is terminal and never auto-retried: the device may
    /// be half-configured and the backup file is the manual recovery point.
    pub async fn rollback(&mut self) -> Result<(), DeployError> {
        let backup = match &self.backup {
            Some(backup) => backup.clone(),
            None => {
                return Err(DeployError::IllegalTransition {
                    from: self.state,
                    to: SessionState::RollingBack,
                });
            }
        };
        self.transition(SessionState::RollingBack)?;
        warn!(
            "rolling back {} from backup {}",
            self.target,
            backup.path.display()
        );

        let contents = match backup.read().await {
            Ok(contents) => contents,
            Err(e) => return Err(self.rollback_failed(&backup, e.to_string())),
        };

        for command in self.profile.restore_commands(&contents) {
            if let Err(message) = self.run_step(&command).await {
                return Err(self.rollback_failed(&backup, message));
            }
        }

        self.transition(SessionState::RolledBack)?;
        info!("{} rolled back to backup {}", self.target, backup.path.display());
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The backup captured by this session, if any.
    pub fn backup_artifact(&self) -> Option<&BackupArtifact> {
        self.backup.as_ref()
    }

    /// Names of artifacts fully applied so far, in order.
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    /// The device target this session holds the lock for.
    pub fn target(&self) -> &str {
        &self.target
    }

    fn transition(&mut self, to: SessionState) -> Result<(), DeployError> {
        if !self.state.can_transition(to) {
            return Err(DeployError::IllegalTransition {
                from: self.state,
                to,
            });
        }
        debug!("session for {}: {} -> {}", self.target, self.state, to);
        self.state = to;
        Ok(())
    }

    /// Run one remote command under the step deadline.
    async fn run_step(&mut self, command: &str) -> std::result::Result<String, String> {
        let channel = match self.channel.as_mut() {
            Some(channel) => channel,
            None => return Err("channel closed".to_string()),
        };
        match tokio::time::timeout(self.options.command_timeout, channel.run(command)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "timed out after {:?}",
                self.options.command_timeout
            )),
        }
    }

    async fn fail_with_rollback(&mut self, artifact: &str, message: String) -> DeployError {
        error!("apply failed on '{artifact}': {message}");
        self.rollback_or_fail(DeployError::Apply {
            artifact: artifact.to_string(),
            message,
        })
        .await
    }

    /// Take the rollback path if possible, otherwise mark the session
    /// failed. Returns the error the caller should surface: the original
    /// failure, or [`DeployError::RollbackFailed`] if rollback broke too.
    async fn rollback_or_fail(&mut self, err: DeployError) -> DeployError {
        if self.options.auto_rollback && self.backup.is_some() {
            if let Err(rollback_err) = self.rollback().await {
                return rollback_err;
            }
        } else {
            let _ = self.transition(SessionState::Failed);
        }
        err
    }

    fn rollback_failed(&mut self, backup: &BackupArtifact, message: String) -> DeployError {
        let _ = self.transition(SessionState::Failed);
        error!(
            "ROLLBACK FAILED on {}: {message}; manual recovery from {}",
            self.target,
            backup.path.display()
        );
        DeployError::RollbackFailed {
            target: self.target.clone(),
            backup: backup.path.clone(),
            message,
        }
    }
}

impl<C: DeviceChannel> Drop for DeploymentSession<C> {
    fn drop(&mut self) {
        if !matches!(
            self.state,
            SessionState::Applying | SessionState::Verifying | SessionState::RollingBack
        ) {
            return;
        }
        warn!(
            "deployment session for {} dropped while {}; device may be half-configured",
            self.target, self.state
        );

        // Without a backup there is nothing to restore from; the warning
        // above is all we can do.
        let (Some(backup), Some(channel), Some(lock)) =
            (self.backup.take(), self.channel.take(), self.lock.take())
        else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!(
                "no runtime to roll back {}; manual recovery from {}",
                self.target,
                backup.path.display()
            );
            return;
        };

        info!("rolling back {} in the background", self.target);
        runtime.spawn(restore_after_drop(
            self.target.clone(),
            self.profile,
            backup,
            channel,
            lock,
            self.options.command_timeout,
        ));
    }
}

/// Best-effort restore for a deployment cancelled mid-flight. Holds the
/// device lock until the restore sequence finishes so no new session can
/// touch the half-configured device.
async fn restore_after_drop<C: DeviceChannel>(
    target: String,
    profile: &'static DeviceProfile,
    backup: BackupArtifact,
    mut channel: C,
    lock: DeviceLock,
    timeout: Duration,
) {
    let _lock = lock;
    let contents = match backup.read().await {
        Ok(contents) => contents,
        Err(e) => {
            error!(
                "ROLLBACK FAILED on {target}: cannot read {}: {e}",
                backup.path.display()
            );
            return;
        }
    };
    for command in profile.restore_commands(&contents) {
        match tokio::time::timeout(timeout, channel.run(&command)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!(
                    "ROLLBACK FAILED on {target}: {e}; manual recovery from {}",
                    backup.path.display()
                );
                return;
            }
            Err(_) => {
                error!(
                    "ROLLBACK FAILED on {target}: timed out after {timeout:?}; manual recovery from {}",
                    backup.path.display()
                );
                return;
            }
        }
    }
    info!("{target} rolled back after cancelled deployment");
}

/// Render the exact command sequence [`DeploymentSession::apply`] would
/// send, without any session or connection.
pub fn dry_run(vendor: Vendor, artifacts: &ArtifactMap) -> Result<Vec<String>, DeployError> {
    let profile = DeviceProfile::for_vendor(vendor)?;
    let mut commands: Vec<String> = profile.apply_prelude.iter().map(|c| c.to_string()).collect();
    for artifact in artifacts.values() {
        commands.extend(artifact.command_lines());
    }
    commands.extend(profile.apply_epilogue.iter().map(|c| c.to_string()));
    Ok(commands)
}

/// Builder for live SSH deployment sessions.
///
/// # Example
///
/// ```rust,no_run
/// use netsmith::deploy::SessionBuilder;
/// use netsmith::model::Vendor;
/// use netsmith::transport::SshConfig;
///
/// # async fn example() -> Result<(), netsmith::Error> {
/// let session = SessionBuilder::new(
///     Vendor::Mikrotik,
///     SshConfig::password("192.0.2.1", "admin", "secret"),
/// )
/// .backup_dir("/var/backups/netsmith")
/// .connect()
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    vendor: Vendor,
    ssh: SshConfig,
    options: SessionOptions,
}

impl SessionBuilder {
    pub fn new(vendor: Vendor, ssh: SshConfig) -> Self {
        Self {
            vendor,
            ssh,
            options: SessionOptions::default(),
        }
    }

    /// Connection attempt ceiling (default: 3).
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.options.connect_attempts = attempts.max(1);
        self
    }

    /// Backoff before the second connection attempt (default: 500ms).
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.options.initial_backoff = backoff;
        self
    }

    /// Per-command deadline (default: 30s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Where backups are written (default: "backups").
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.backup_dir = dir.into();
        self
    }

    /// Disable automatic rollback on apply/verify failure.
    pub fn auto_rollback(mut self, enabled: bool) -> Self {
        self.options.auto_rollback = enabled;
        self
    }

    /// Permit apply without a backup. Logged loudly when used.
    pub fn allow_unbacked_apply(mut self, allowed: bool) -> Self {
        self.options.allow_unbacked_apply = allowed;
        self
    }

    /// Connect, authenticate, and open the command channel.
    pub async fn connect(self) -> Result<DeploymentSession<CommandChannel>, DeployError> {
        let profile = DeviceProfile::for_vendor(self.vendor)?;
        let target = self.ssh.host.clone();
        let ssh = self.ssh;
        let command_timeout = self.options.command_timeout;

        DeploymentSession::connect_with(self.vendor, &target, self.options, move |_| {
            let ssh = ssh.clone();
            async move {
                let transport = SshTransport::connect(ssh).await.map_err(into_transport)?;
                CommandChannel::open(
                    transport,
                    profile.prompt_pattern,
                    profile.failure_patterns_owned(),
                    command_timeout,
                )
                .await
                .map_err(|_| TransportError::Disconnected)
            }
        })
        .await
    }
}

fn into_transport(err: Error) -> TransportError {
    match err {
        Error::Transport(e) => e,
        other => TransportError::Io(io::Error::other(other.to_string())),
    }
}

fn truncate(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.len() <= DRIFT_OBSERVED_MAX {
        return trimmed.to_string();
    }
    let mut end = DRIFT_OBSERVED_MAX;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::ChannelError;
    use crate::generate::testutil::sample_config;
    use crate::generate::{Artifact, generator_for};

    /// Scripted device: records every command, answers from a response
    /// table, rejects commands containing `fail_contains`, and hangs
    /// forever on commands containing `stall_contains`.
    #[derive(Clone, Default)]
    struct FakeChannel {
        sent: Arc<Mutex<Vec<String>>>,
        responses: HashMap<String, String>,
        fail_contains: Option<String>,
        stall_contains: Option<String>,
    }

    impl FakeChannel {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl DeviceChannel for FakeChannel {
        async fn run(&mut self, command: &str) -> Result<String, ChannelError> {
            self.sent.lock().unwrap().push(command.to_string());
            if let Some(pattern) = &self.stall_contains
                && command.contains(pattern.as_str())
            {
                std::future::pending::<()>().await;
            }
            if let Some(pattern) = &self.fail_contains
                && command.contains(pattern.as_str())
            {
                return Err(ChannelError::CommandRejected {
                    command: command.to_string(),
                    output: "syntax error".to_string(),
                });
            }
            Ok(self.responses.get(command).cloned().unwrap_or_default())
        }

        async fn close(self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn options(dir: &tempfile::TempDir) -> SessionOptions {
        let _ = env_logger::builder().is_test(true).try_init();
        SessionOptions {
            initial_backoff: Duration::ZERO,
            backup_dir: dir.path().to_path_buf(),
            ..SessionOptions::default()
        }
    }

    async fn session_for(
        target: &str,
        options: SessionOptions,
        fake: FakeChannel,
    ) -> DeploymentSession<FakeChannel> {
        DeploymentSession::connect_with(Vendor::Mikrotik, target, options, move |_| {
            let fake = fake.clone();
            async move { Ok(fake) }
        })
        .await
        .unwrap()
    }

    /// Five one-line artifacts named a1..a5.
    fn five_artifacts() -> ArtifactMap {
        let mut artifacts = ArtifactMap::new();
        for i in 1..=5 {
            artifacts.insert(
                format!("a{i}"),
                Artifact::Text(format!("/cmd-a{i} run\n")),
            );
        }
        artifacts
    }

    #[tokio::test]
    async fn test_full_deploy_reaches_complete() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample_config(Vendor::Mikrotik);
        let artifacts = generator_for(Vendor::Mikrotik)
            .unwrap()
            .generate(&config)
            .unwrap();

        // Answer every probe with exactly what it expects.
        let profile = DeviceProfile::for_vendor(Vendor::Mikrotik).unwrap();
        let responses: HashMap<String, String> = profile
            .verify_probes(&config)
            .into_iter()
            .map(|p| (p.command, p.expect))
            .chain([("/export".to_string(), "/ip address\n".to_string())])
            .collect();

        let fake = FakeChannel {
            responses,
            ..FakeChannel::default()
        };
        let mut session = session_for("10.0.0.1", options(&dir), fake).await;

        session.backup().await.unwrap();
        session.apply(&artifacts).await.unwrap();
        session.verify(&config).await.unwrap();

        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.applied(), &["router", "wireless", "firewall"]);
        assert!(session.backup_artifact().unwrap().path.exists());
    }

    #[tokio::test]
    async fn test_apply_failure_on_third_artifact_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeChannel {
            responses: HashMap::from([(
                "/export".to_string(),
                "/restore first\n/restore second\n".to_string(),
            )]),
            fail_contains: Some("cmd-a3".to_string()),
            ..FakeChannel::default()
        };
        let mut session = session_for("10.0.0.2", options(&dir), fake.clone()).await;

        let backup = session.backup().await.unwrap();
        let err = session.apply(&five_artifacts()).await.unwrap_err();

        assert!(matches!(err, DeployError::Apply { ref artifact, .. } if artifact == "a3"));
        assert_eq!(session.state(), SessionState::RolledBack);
        // Cursor stops at the last fully applied artifact.
        assert_eq!(session.applied(), &["a1", "a2"]);
        // Rollback used the same backup artifact captured before apply.
        assert_eq!(session.backup_artifact(), Some(&backup));
        let sent = fake.sent();
        assert!(sent.contains(&"/restore first".to_string()));
        assert!(sent.contains(&"/restore second".to_string()));
    }

    #[tokio::test]
    async fn test_backup_failure_aborts_with_nothing_applied() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeChannel {
            fail_contains: Some("/export".to_string()),
            ..FakeChannel::default()
        };
        let mut session = session_for("10.0.0.3", options(&dir), fake.clone()).await;

        let err = session.backup().await.unwrap_err();
        assert!(matches!(err, DeployError::Backup { .. }));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.applied().is_empty());
        // The export was the only command that reached the device.
        assert_eq!(fake.sent(), vec!["/export"]);

        // The session is spent; apply is rejected.
        let err = session.apply(&five_artifacts()).await.unwrap_err();
        assert!(matches!(err, DeployError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_apply_without_backup_needs_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            session_for("10.0.0.4", options(&dir), FakeChannel::default()).await;

        let err = session.apply(&five_artifacts()).await.unwrap_err();
        assert!(matches!(
            err,
            DeployError::IllegalTransition {
                to: SessionState::Applying,
                ..
            }
        ));

        let mut opts = options(&dir);
        opts.allow_unbacked_apply = true;
        let mut session = session_for("10.0.0.5", opts, FakeChannel::default()).await;
        session.apply(&five_artifacts()).await.unwrap();
        assert_eq!(session.applied().len(), 5);
    }

    #[tokio::test]
    async fn test_auth_failure_is_never_retried() {
        let dir = tempfile::tempdir().unwrap();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let err = DeploymentSession::<FakeChannel>::connect_with(
            Vendor::Mikrotik,
            "10.0.0.6",
            options(&dir),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(TransportError::AuthenticationFailed {
                        user: "admin".to_string(),
                    })
                }
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Authentication { ref user, .. } if user == "admin"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_retries_up_to_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let err = DeploymentSession::<FakeChannel>::connect_with(
            Vendor::Mikrotik,
            "10.0.0.7",
            options(&dir),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::Disconnected) }
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DeployError::Connection { attempts: 3, .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rollback_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        // "bad-" matches both the failing apply line and a restore line.
        let fake = FakeChannel {
            responses: HashMap::from([(
                "/export".to_string(),
                "/bad-restore line\n".to_string(),
            )]),
            fail_contains: Some("bad-".to_string()),
            ..FakeChannel::default()
        };
        let mut session = session_for("10.0.0.8", options(&dir), fake).await;
        session.backup().await.unwrap();

        let mut artifacts = ArtifactMap::new();
        artifacts.insert(
            "router".to_string(),
            Artifact::Text("/bad-apply line\n".to_string()),
        );
        let err = session.apply(&artifacts).await.unwrap_err();

        assert!(matches!(err, DeployError::RollbackFailed { .. }));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_verify_drift_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample_config(Vendor::Mikrotik);
        // No probe responses at all: every probe observes empty output.
        let fake = FakeChannel {
            responses: HashMap::from([("/export".to_string(), "/ip address\n".to_string())]),
            ..FakeChannel::default()
        };
        let mut session = session_for("10.0.0.9", options(&dir), fake).await;
        session.backup().await.unwrap();
        session
            .apply(&generator_for(Vendor::Mikrotik).unwrap().generate(&config).unwrap())
            .await
            .unwrap();

        let err = session.verify(&config).await.unwrap_err();
        match err {
            DeployError::Verify { findings } => {
                assert!(!findings.is_empty());
                assert_eq!(findings[0].field, "wan.address");
                assert_eq!(findings[0].expected, "203.0.113.10/29");
            }
            other => panic!("expected Verify, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::RolledBack);
    }

    #[tokio::test]
    async fn test_second_session_on_same_target_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let _first = session_for("10.0.0.10", options(&dir), FakeChannel::default()).await;

        let err = DeploymentSession::<FakeChannel>::connect_with(
            Vendor::Mikrotik,
            "10.0.0.10",
            options(&dir),
            |_| async { Ok(FakeChannel::default()) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::DeviceBusy { .. }));
    }

    #[tokio::test]
    async fn test_session_debug_names_target_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_for("10.0.0.11", options(&dir), FakeChannel::default()).await;
        let debug = format!("{session:?}");
        assert!(debug.contains("10.0.0.11"));
        assert!(debug.contains("Authenticated"));
    }

    #[tokio::test]
    async fn test_epilogue_failure_reports_epilogue_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeChannel {
            responses: HashMap::from([(
                "show configuration commands".to_string(),
                "set system host-name gw\n".to_string(),
            )]),
            fail_contains: Some("commit".to_string()),
            ..FakeChannel::default()
        };
        let mut opts = options(&dir);
        opts.auto_rollback = false;
        let mut session =
            DeploymentSession::connect_with(Vendor::Edgerouter, "10.0.0.12", opts, move |_| {
                let fake = fake.clone();
                async move { Ok(fake) }
            })
            .await
            .unwrap();

        session.backup().await.unwrap();
        let err = session.apply(&five_artifacts()).await.unwrap_err();

        // Every artifact went through; the failure was in the wrap-up
        // commands, and the cursor says so rather than naming an artifact.
        assert!(matches!(err, DeployError::Apply { ref artifact, .. } if artifact == "epilogue"));
        assert_eq!(session.applied().len(), 5);
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_cancelled_apply_rolls_back_before_releasing_lock() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeChannel {
            responses: HashMap::from([(
                "/export".to_string(),
                "/restore-line\n".to_string(),
            )]),
            stall_contains: Some("cmd-a2".to_string()),
            ..FakeChannel::default()
        };
        let sent = fake.sent.clone();
        let opts = options(&dir);

        let task = tokio::spawn(async move {
            let mut session = session_for("10.0.0.13", opts, fake).await;
            session.backup().await.unwrap();
            // Hangs on the second artifact until the task is aborted.
            let _ = session.apply(&five_artifacts()).await;
        });

        for _ in 0..200 {
            if sent.lock().unwrap().iter().any(|c| c.contains("cmd-a2")) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();
        let _ = task.await;

        // The drop hook replays the restore sequence in the background and
        // only releases the device lock once it finishes.
        let mut rolled_back = false;
        for _ in 0..200 {
            let replayed = sent.lock().unwrap().iter().any(|c| c == "/restore-line");
            if replayed && DeviceLock::try_acquire("10.0.0.13").is_ok() {
                rolled_back = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(rolled_back, "restore never replayed or lock never released");
    }

    #[test]
    fn test_dry_run_matches_apply_sequence() {
        let artifacts = five_artifacts();

        let mikrotik = dry_run(Vendor::Mikrotik, &artifacts).unwrap();
        assert_eq!(mikrotik.len(), 5);
        assert_eq!(mikrotik[0], "/cmd-a1 run");

        let edgerouter = dry_run(Vendor::Edgerouter, &artifacts).unwrap();
        assert_eq!(edgerouter.first().map(String::as_str), Some("configure"));
        assert_eq!(edgerouter.last().map(String::as_str), Some("exit"));

        assert!(matches!(
            dry_run(Vendor::Unifi, &artifacts),
            Err(DeployError::UnsupportedVendor { .. })
        ));
    }
}
