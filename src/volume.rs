//! Volume identifiers and mount option construction.

use std::fmt;

use thiserror::Error;

/// Number of leading identifier characters burned into device serials.
pub const SERIAL_PREFIX_LEN: usize = 20;

/// Errors raised when a volume identifier fails validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum VolumeIdError {
    /// Raised when the identifier is empty.
    #[error("volume id must not be empty")]
    Empty,
    /// Raised when the identifier is too short to derive a device serial.
    #[error("volume id {volume_id:?} has {len} characters; at least 20 are required")]
    TooShort {
        /// Identifier as supplied by the caller.
        volume_id: String,
        /// Number of characters in the identifier.
        len: usize,
    },
}

/// Opaque identifier naming a volume in the storage backend.
///
/// Construction guarantees at least [`SERIAL_PREFIX_LEN`] characters so the
/// truncated serial key can always be derived.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct VolumeId(String);

impl VolumeId {
    /// Validates and wraps a volume identifier.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeIdError::Empty`] for an empty identifier and
    /// [`VolumeIdError::TooShort`] when it has fewer than
    /// [`SERIAL_PREFIX_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, VolumeIdError> {
        let volume_id = value.into();
        if volume_id.is_empty() {
            return Err(VolumeIdError::Empty);
        }
        let len = volume_id.chars().count();
        if len < SERIAL_PREFIX_LEN {
            return Err(VolumeIdError::TooShort { volume_id, len });
        }
        Ok(Self(volume_id))
    }

    /// Returns the first [`SERIAL_PREFIX_LEN`] characters of the identifier.
    #[must_use]
    pub fn truncated(&self) -> String {
        self.0.chars().take(SERIAL_PREFIX_LEN).collect()
    }

    /// Returns the identifier with every hyphen removed.
    #[must_use]
    pub fn without_hyphens(&self) -> String {
        self.0.chars().filter(|ch| *ch != '-').collect()
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Ordered mount flags handed to the mount provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MountOptions(Vec<String>);

impl MountOptions {
    /// Builds options: `ro` or `rw` first, then the extra flags in caller
    /// order.
    #[must_use]
    pub fn new(read_only: bool, extra_flags: &[String]) -> Self {
        let access = if read_only { "ro" } else { "rw" };
        let mut flags = Vec::with_capacity(extra_flags.len() + 1);
        flags.push(access.to_owned());
        flags.extend(extra_flags.iter().cloned());
        Self(flags)
    }

    /// Returns the flags in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` when the access flag is `ro`.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.0.first().is_some_and(|flag| flag == "ro")
    }
}

impl fmt::Display for MountOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0.join(","))
    }
}
