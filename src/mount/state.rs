//! Mount state checks backed by the provider's mount point probes.

use camino::Utf8Path;

use crate::provider::MountProvider;

/// Whether a target path currently hosts a mount.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MountState {
    /// The path is a mount point.
    Mounted,
    /// The path is not a mount point.
    NotMounted,
}

impl MountState {
    /// Converts a provider "is not a mount point" answer.
    #[must_use]
    pub const fn from_not_mount_point(not_mount_point: bool) -> Self {
        if not_mount_point {
            Self::NotMounted
        } else {
            Self::Mounted
        }
    }
}

/// Checks `target` ahead of a publish.
pub(super) async fn before_attach<P: MountProvider>(
    provider: &P,
    target: &Utf8Path,
) -> Result<MountState, P::Error> {
    provider
        .is_not_mount_point_attach(target)
        .await
        .map(MountState::from_not_mount_point)
}

/// Checks `target` ahead of an unpublish.
pub(super) async fn before_detach<P: MountProvider>(
    provider: &P,
    target: &Utf8Path,
) -> Result<MountState, P::Error> {
    provider
        .is_not_mount_point_detach(target)
        .await
        .map(MountState::from_not_mount_point)
}
