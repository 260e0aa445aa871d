//! Backup artifacts captured before any mutation.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;

use crate::model::Vendor;

/// A device configuration export written to disk before apply.
///
/// The path is the manual recovery point if rollback itself fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    /// Where the export was written.
    pub path: PathBuf,

    /// When it was captured.
    pub captured_at: DateTime<Utc>,
}

impl BackupArtifact {
    /// Write `contents` under `dir` with a timestamped, target-scoped name.
    pub async fn write(
        dir: &Path,
        target: &str,
        vendor: Vendor,
        contents: &str,
    ) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let captured_at = Utc::now();
        let stamp = captured_at.format("%Y%m%dT%H%M%SZ");
        let file_name = format!("{}-{}-{stamp}.backup", sanitize(target), vendor);
        let path = dir.join(file_name);

        tokio::fs::write(&path, contents).await?;
        info!("backup of {target} written to {}", path.display());

        Ok(Self { path, captured_at })
    }

    /// Read the captured export back for rollback.
    pub async fn read(&self) -> io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }

    /// Timestamp in RFC 3339 for operator-facing output.
    pub fn captured_at_rfc3339(&self) -> String {
        self.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Keep file names portable: targets are hostnames or IPs, but ':' from
/// IPv6 and '/' must not reach the filesystem.
fn sanitize(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
