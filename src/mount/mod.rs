//! Publish and unpublish orchestration.
//!
//! [`MountOrchestrator`] composes the [`DeviceResolver`], the provider's mount
//! point probes, and the provider's mount operations. Publish is idempotent
//! on an already mounted target; unpublish of a target that is not mounted
//! fails with [`NodeError::NotMounted`].

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, instrument};

use crate::device::DeviceResolver;
use crate::provider::{MountProvider, MountProviderSource, ProviderError};
use crate::volume::{MountOptions, VolumeId};

mod error;
mod locks;
mod state;

pub use error::{ErrorKind, NodeError};
pub use locks::{TargetGuard, TargetLocks};
pub use state::MountState;

/// Validated inputs for a publish.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishRequest {
    /// Volume whose device should be mounted.
    pub volume_id: VolumeId,
    /// Mount point supplied by the caller.
    pub target_path: Utf8PathBuf,
    /// Filesystem type; empty lets the provider choose.
    pub fs_type: String,
    /// Mount read-only when `true`.
    pub read_only: bool,
    /// Extra mount flags appended after the access flag.
    pub mount_flags: Vec<String>,
}

/// Drives idempotent mount transitions for target paths.
///
/// The mount state check and the transition that follows run under a
/// per-target lock, so concurrent calls for one target are serialised.
#[derive(Debug)]
pub struct MountOrchestrator<S> {
    source: S,
    resolver: DeviceResolver,
    locks: TargetLocks,
}

impl<S: MountProviderSource> MountOrchestrator<S> {
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(source: S, resolver: DeviceResolver) -> Self {
        Self {
            source,
            resolver,
            locks: TargetLocks::new(),
        }
    }

    /// Resolver used to locate devices.
    #[must_use]
    pub const fn resolver(&self) -> &DeviceResolver {
        &self.resolver
    }

    /// Lock registry guarding target paths.
    #[must_use]
    pub const fn locks(&self) -> &TargetLocks {
        &self.locks
    }

    /// Mounts the volume's device at the request's target path unless the
    /// target is already a mount point.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Resolve`] when the device cannot be located and an
    /// internal [`NodeError`] variant when any provider operation fails.
    #[instrument(
        skip_all,
        fields(volume_id = %request.volume_id, target = %request.target_path)
    )]
    pub async fn publish(&self, request: &PublishRequest) -> Result<(), NodeError<ProviderError<S>>> {
        let device = self.resolver.resolve(&request.volume_id)?;
        let provider = self
            .source
            .mount_provider()
            .map_err(NodeError::ProviderUnavailable)?;

        provider
            .scan_for_attach(&device)
            .await
            .map_err(|source| NodeError::Scan {
                device: device.clone(),
                source,
            })?;

        let _guard = self.locks.lock(&request.target_path).await;
        let mount_state = state::before_attach(provider, &request.target_path)
            .await
            .map_err(|source| NodeError::MountCheck {
                target: request.target_path.clone(),
                source,
            })?;

        if mount_state == MountState::Mounted {
            debug!(%device, "target already mounted, nothing to publish");
            return Ok(());
        }

        let options = MountOptions::new(request.read_only, &request.mount_flags);
        provider
            .format_and_mount(&device, &request.target_path, &request.fs_type, &options)
            .await
            .map_err(|source| NodeError::Mount {
                device: device.clone(),
                target: request.target_path.clone(),
                source,
            })?;

        info!(%device, fs_type = %request.fs_type, %options, "volume published");
        Ok(())
    }

    /// Unmounts `target_path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NotMounted`] when the target is not a mount point
    /// and an internal [`NodeError`] variant when any provider operation
    /// fails.
    #[instrument(skip_all, fields(target = %target_path))]
    pub async fn unpublish(&self, target_path: &Utf8Path) -> Result<(), NodeError<ProviderError<S>>> {
        let provider = self
            .source
            .mount_provider()
            .map_err(NodeError::ProviderUnavailable)?;

        let _guard = self.locks.lock(target_path).await;
        let mount_state = state::before_detach(provider, target_path)
            .await
            .map_err(|source| NodeError::MountCheck {
                target: target_path.to_owned(),
                source,
            })?;

        if mount_state == MountState::NotMounted {
            return Err(NodeError::NotMounted {
                target: target_path.to_owned(),
            });
        }

        provider
            .unmount_path(target_path)
            .await
            .map_err(|source| NodeError::Unmount {
                target: target_path.to_owned(),
                source,
            })?;

        info!("volume unpublished");
        Ok(())
    }
}
