//! Error types for the publish workflow.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::device::ResolveError;
use crate::volume::VolumeIdError;

/// Coarse classification a dispatcher maps onto a status code.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The caller supplied a malformed request.
    InvalidArgument,
    /// The device or mount is absent; orchestration above may treat this as
    /// non-fatal.
    NotFound,
    /// An operational or environment failure.
    Internal,
}

/// Errors raised while publishing or unpublishing a volume.
#[derive(Debug, Error)]
pub enum NodeError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Raised when a request field is missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Raised when the volume identifier fails validation.
    #[error("invalid volume id: {0}")]
    InvalidVolumeId(#[from] VolumeIdError),
    /// Raised when device resolution fails.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Raised when no mount provider is available.
    #[error("mount provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),
    /// Raised when the device scan fails.
    #[error("failed to scan for {device}: {source}")]
    Scan {
        /// Device that was scanned.
        device: Utf8PathBuf,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when the mount point check fails.
    #[error("failed to check mount state of {target}: {source}")]
    MountCheck {
        /// Target path that was checked.
        target: Utf8PathBuf,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when formatting or mounting fails.
    #[error("failed to mount {device} at {target}: {source}")]
    Mount {
        /// Device being mounted.
        device: Utf8PathBuf,
        /// Target mount point.
        target: Utf8PathBuf,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
    /// Raised when unpublishing a target that is not a mount point.
    #[error("volume not mounted at {target}")]
    NotMounted {
        /// Target path that was not mounted.
        target: Utf8PathBuf,
    },
    /// Raised when unmounting fails.
    #[error("failed to unmount {target}: {source}")]
    Unmount {
        /// Target path being unmounted.
        target: Utf8PathBuf,
        /// Provider-specific error.
        #[source]
        source: ProviderError,
    },
}

impl<ProviderError> NodeError<ProviderError>
where
    ProviderError: std::error::Error + 'static,
{
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::InvalidVolumeId(_) => ErrorKind::InvalidArgument,
            Self::Resolve(ResolveError::NotFound { .. }) | Self::NotMounted { .. } => {
                ErrorKind::NotFound
            }
            Self::Resolve(ResolveError::Enumeration { .. })
            | Self::ProviderUnavailable(_)
            | Self::Scan { .. }
            | Self::MountCheck { .. }
            | Self::Mount { .. }
            | Self::Unmount { .. } => ErrorKind::Internal,
        }
    }
}
