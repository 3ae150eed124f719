//! Mount provider abstraction for the host-level scan, mount, and identity
//! operations this crate drives but never performs itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use camino::Utf8Path;

use crate::volume::MountOptions;

/// Future returned by mount provider operations.
pub type ProviderFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Host operations consumed by the publish workflow.
///
/// Implementations wrap the platform's mount, format, and instance metadata
/// tooling. The two mount point checks differ by caller intent: the attach
/// variant may prepare the target directory, the detach variant must not.
pub trait MountProvider: Send + Sync {
    /// Provider specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Prompts the host to discover a freshly attached device.
    fn scan_for_attach<'a>(&'a self, device_path: &'a Utf8Path) -> ProviderFuture<'a, (), Self::Error>;

    /// Returns `true` when `target_path` is not a mount point, ahead of a
    /// publish.
    fn is_not_mount_point_attach<'a>(
        &'a self,
        target_path: &'a Utf8Path,
    ) -> ProviderFuture<'a, bool, Self::Error>;

    /// Returns `true` when `target_path` is not a mount point, ahead of an
    /// unpublish.
    fn is_not_mount_point_detach<'a>(
        &'a self,
        target_path: &'a Utf8Path,
    ) -> ProviderFuture<'a, bool, Self::Error>;

    /// Formats the device when it carries no filesystem, then mounts it.
    fn format_and_mount<'a>(
        &'a self,
        device_path: &'a Utf8Path,
        target_path: &'a Utf8Path,
        fs_type: &'a str,
        options: &'a MountOptions,
    ) -> ProviderFuture<'a, (), Self::Error>;

    /// Unmounts `target_path`.
    fn unmount_path<'a>(&'a self, target_path: &'a Utf8Path) -> ProviderFuture<'a, (), Self::Error>;

    /// Returns the backend's identifier for this host. May be empty.
    fn instance_id(&self) -> ProviderFuture<'_, String, Self::Error>;
}

/// Hands out the mount provider for a single call.
///
/// Acquisition may fail, for example while instance metadata is still
/// unavailable.
pub trait MountProviderSource: Send + Sync {
    /// Provider handed out by this source.
    type Provider: MountProvider;

    /// Returns the provider to use for the current call.
    ///
    /// # Errors
    ///
    /// Returns the provider's error type when no provider is available.
    fn mount_provider(&self) -> Result<&Self::Provider, <Self::Provider as MountProvider>::Error>;
}

/// Error type of the provider behind a [`MountProviderSource`].
pub type ProviderError<S> = <<S as MountProviderSource>::Provider as MountProvider>::Error;

impl<P: MountProvider> MountProviderSource for Arc<P> {
    type Provider = P;

    fn mount_provider(&self) -> Result<&P, P::Error> {
        Ok(self.as_ref())
    }
}
