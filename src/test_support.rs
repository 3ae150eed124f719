//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::provider::{MountProvider, MountProviderSource, ProviderFuture};
use crate::volume::MountOptions;

/// Records a single call made through [`ScriptedMountProvider`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProviderCall {
    /// `scan_for_attach` on a device path.
    Scan(Utf8PathBuf),
    /// `is_not_mount_point_attach` on a target path.
    CheckAttach(Utf8PathBuf),
    /// `is_not_mount_point_detach` on a target path.
    CheckDetach(Utf8PathBuf),
    /// `format_and_mount` with its arguments.
    FormatAndMount {
        /// Device path.
        device: Utf8PathBuf,
        /// Target path.
        target: Utf8PathBuf,
        /// Filesystem type.
        fs_type: String,
        /// Mount options in order.
        options: Vec<String>,
    },
    /// `unmount_path` on a target path.
    Unmount(Utf8PathBuf),
    /// `instance_id`.
    InstanceId,
}

/// Failure points a [`ScriptedMountProvider`] can be told to hit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptedFailure {
    /// Provider acquisition fails.
    Acquire,
    /// Device scan fails.
    Scan,
    /// Either mount point check fails.
    MountCheck,
    /// Format and mount fails.
    Mount,
    /// Unmount fails.
    Unmount,
    /// Instance ID lookup fails.
    InstanceId,
}

/// Errors raised by the scripted provider to model failure points.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScriptedProviderError {
    /// Provider acquisition failed.
    #[error("mount provider not configured")]
    Acquire,
    /// Device scan failed.
    #[error("scan failure")]
    Scan,
    /// Mount point check failed.
    #[error("mount point check failure")]
    MountCheck,
    /// Format and mount failed.
    #[error("mount failure")]
    Mount,
    /// Unmount failed.
    #[error("unmount failure")]
    Unmount,
    /// Instance ID lookup failed.
    #[error("instance metadata unavailable")]
    InstanceId,
}

#[derive(Debug, Default)]
struct State {
    failures: Vec<ScriptedFailure>,
    mounted: BTreeSet<Utf8PathBuf>,
    instance_id: String,
    calls: Vec<ProviderCall>,
}

/// In-memory mount provider that tracks mounted targets and records calls.
///
/// Clones share state, so a test can keep one handle for assertions while
/// another drives the code under test.
#[derive(Clone, Debug, Default)]
pub struct ScriptedMountProvider {
    state: Arc<Mutex<State>>,
}

impl ScriptedMountProvider {
    /// Creates a provider with no mounts and an empty instance ID.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the given operation fail from now on.
    pub fn fail(&self, failure: ScriptedFailure) {
        self.state().failures.push(failure);
    }

    /// Marks `target` as already mounted.
    pub fn mark_mounted(&self, target: impl Into<Utf8PathBuf>) {
        self.state().mounted.insert(target.into());
    }

    /// Sets the identifier returned by `instance_id`.
    pub fn set_instance_id(&self, value: impl Into<String>) {
        self.state().instance_id = value.into();
    }

    /// Returns `true` when `target` is currently mounted.
    #[must_use]
    pub fn is_mounted(&self, target: &Utf8Path) -> bool {
        self.state().mounted.contains(target)
    }

    /// Returns a snapshot of every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    /// Returns the recorded `format_and_mount` calls.
    #[must_use]
    pub fn mount_calls(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ProviderCall::FormatAndMount { .. }))
            .collect()
    }

    /// Returns the number of recorded `unmount_path` calls.
    #[must_use]
    pub fn unmount_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, ProviderCall::Unmount(_)))
            .count()
    }

    fn record(
        &self,
        call: ProviderCall,
        failure: ScriptedFailure,
        error: ScriptedProviderError,
    ) -> Result<(), ScriptedProviderError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failures.contains(&failure) {
            return Err(error);
        }
        Ok(())
    }
}

impl MountProvider for ScriptedMountProvider {
    type Error = ScriptedProviderError;

    fn scan_for_attach<'a>(&'a self, device_path: &'a Utf8Path) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.record(
                ProviderCall::Scan(device_path.to_owned()),
                ScriptedFailure::Scan,
                ScriptedProviderError::Scan,
            )
        })
    }

    fn is_not_mount_point_attach<'a>(
        &'a self,
        target_path: &'a Utf8Path,
    ) -> ProviderFuture<'a, bool, Self::Error> {
        Box::pin(async move {
            self.record(
                ProviderCall::CheckAttach(target_path.to_owned()),
                ScriptedFailure::MountCheck,
                ScriptedProviderError::MountCheck,
            )?;
            Ok(!self.is_mounted(target_path))
        })
    }

    fn is_not_mount_point_detach<'a>(
        &'a self,
        target_path: &'a Utf8Path,
    ) -> ProviderFuture<'a, bool, Self::Error> {
        Box::pin(async move {
            self.record(
                ProviderCall::CheckDetach(target_path.to_owned()),
                ScriptedFailure::MountCheck,
                ScriptedProviderError::MountCheck,
            )?;
            Ok(!self.is_mounted(target_path))
        })
    }

    fn format_and_mount<'a>(
        &'a self,
        device_path: &'a Utf8Path,
        target_path: &'a Utf8Path,
        fs_type: &'a str,
        options: &'a MountOptions,
    ) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.record(
                ProviderCall::FormatAndMount {
                    device: device_path.to_owned(),
                    target: target_path.to_owned(),
                    fs_type: fs_type.to_owned(),
                    options: options.as_slice().to_vec(),
                },
                ScriptedFailure::Mount,
                ScriptedProviderError::Mount,
            )?;
            // Give concurrent callers a chance to interleave mid-mount.
            tokio::task::yield_now().await;
            self.state().mounted.insert(target_path.to_owned());
            Ok(())
        })
    }

    fn unmount_path<'a>(&'a self, target_path: &'a Utf8Path) -> ProviderFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.record(
                ProviderCall::Unmount(target_path.to_owned()),
                ScriptedFailure::Unmount,
                ScriptedProviderError::Unmount,
            )?;
            self.state().mounted.remove(target_path);
            Ok(())
        })
    }

    fn instance_id(&self) -> ProviderFuture<'_, String, Self::Error> {
        Box::pin(async move {
            self.record(
                ProviderCall::InstanceId,
                ScriptedFailure::InstanceId,
                ScriptedProviderError::InstanceId,
            )?;
            Ok(self.state().instance_id.clone())
        })
    }
}

impl MountProviderSource for ScriptedMountProvider {
    type Provider = Self;

    fn mount_provider(&self) -> Result<&Self, ScriptedProviderError> {
        if self.state().failures.contains(&ScriptedFailure::Acquire) {
            return Err(ScriptedProviderError::Acquire);
        }
        Ok(self)
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Sets environment variables for the lifetime of the guard and restores the
/// previous values on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets `set` and removes `unset` while holding [`ENV_LOCK`].
    pub async fn apply(set: &[(&str, &str)], unset: &[&str]) -> Self {
        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(set.len() + unset.len());
        for (key, value) in set {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::set_var(key, value) };
        }
        for key in unset {
            previous.push(((*key).to_owned(), env::var_os(key)));
            // SAFETY: environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::remove_var(key) };
        }
        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in self.previous.iter().rev() {
            // SAFETY: environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
