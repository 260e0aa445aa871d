//! Per-device deployment locks.
//!
//! Two sessions applying to the same device at once would interleave
//! commands. The global table hands out one async mutex per target;
//! different targets are fully independent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use tokio::sync::OwnedMutexGuard;

use crate::error::DeployError;

static LOCKS: Lazy<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Exclusive hold on one device target, released on drop.
pub struct DeviceLock {
    target: String,
    _guard: OwnedMutexGuard<()>,
}

impl DeviceLock {
    /// Acquire the lock for `target` without waiting.
    ///
    /// Fails with [`DeployError::DeviceBusy`] if another session holds it.
    /// Deployments do not queue behind each other; a busy device is an
    /// operator decision, not a wait.
    pub fn try_acquire(target: &str) -> Result<Self, DeployError> {
        let mutex = {
            let mut table = LOCKS.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(target.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        let guard = mutex
            .try_lock_owned()
            .map_err(|_| DeployError::DeviceBusy {
                target: target.to_string(),
            })?;

        Ok(Self {
            target: target.to_string(),
            _guard: guard,
        })
    }

    /// The locked target.
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let first = DeviceLock::try_acquire("lock-test-198.51.100.7").unwrap();
        let second = DeviceLock::try_acquire("lock-test-198.51.100.7");
        assert!(matches!(second, Err(DeployError::DeviceBusy { .. })));
        drop(first);
        assert!(DeviceLock::try_acquire("lock-test-198.51.100.7").is_ok());
    }

    #[test]
    fn test_different_targets_independent() {
        let _a = DeviceLock::try_acquire("lock-test-a").unwrap();
        let _b = DeviceLock::try_acquire("lock-test-b").unwrap();
    }
}
