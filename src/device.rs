//! Resolution of attached block devices from volume identifiers.
//!
//! Hypervisor drivers burn the (truncated) volume identifier into the disk
//! serial, which udev exposes as a symlink under `/dev/disk/by-id`. The
//! resolver synthesises the names each known driver would produce and looks
//! for them in that directory. This is a naming heuristic, not an
//! authoritative volume-to-device mapping.

use std::collections::BTreeSet;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::{debug, warn};

use crate::volume::VolumeId;

/// Directory of stable identifier-keyed device symlinks.
pub const DEFAULT_BY_ID_DIR: &str = "/dev/disk/by-id";

/// Errors raised while resolving a device path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Raised when no candidate name is present in the by-id directory.
    #[error("device not found for volume {volume_id} by serial identifier")]
    NotFound {
        /// Volume whose device could not be located.
        volume_id: String,
    },
    /// Raised when the by-id directory exists but cannot be listed.
    #[error("failed to enumerate devices in {dir}: {source}")]
    Enumeration {
        /// Directory that could not be listed.
        dir: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Driver naming conventions, in match priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceConvention {
    /// KVM virtio-blk: `virtio-<first 20 chars>`.
    VirtioBlk,
    /// KVM virtio-scsi: `scsi-0QEMU_QEMU_HARDDISK_<first 20 chars>`.
    VirtioScsi,
    /// ESXi: `wwn-0x<id without hyphens>`.
    Wwn,
}

impl DeviceConvention {
    /// Every convention in priority order.
    pub const ALL: [Self; 3] = [Self::VirtioBlk, Self::VirtioScsi, Self::Wwn];

    /// Returns the by-id entry name this convention yields for `volume_id`.
    #[must_use]
    pub fn device_name(self, volume_id: &VolumeId) -> String {
        match self {
            Self::VirtioBlk => format!("virtio-{}", volume_id.truncated()),
            Self::VirtioScsi => format!("scsi-0QEMU_QEMU_HARDDISK_{}", volume_id.truncated()),
            Self::Wwn => format!("wwn-0x{}", volume_id.without_hyphens()),
        }
    }
}

/// Returns the candidate by-id entry names for `volume_id` in priority order.
#[must_use]
pub fn candidate_names(volume_id: &VolumeId) -> [String; 3] {
    DeviceConvention::ALL.map(|convention| convention.device_name(volume_id))
}

/// Maps volume identifiers onto entries of the by-id directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceResolver {
    by_id_dir: Utf8PathBuf,
}

impl DeviceResolver {
    /// Creates a resolver scanning `by_id_dir`.
    #[must_use]
    pub fn new(by_id_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            by_id_dir: by_id_dir.into(),
        }
    }

    /// Directory scanned by this resolver.
    #[must_use]
    pub fn by_id_dir(&self) -> &Utf8Path {
        &self.by_id_dir
    }

    /// Returns the device path of the attached block device for `volume_id`.
    ///
    /// When several candidates are present the first convention in
    /// [`DeviceConvention::ALL`] wins. A missing by-id directory counts as
    /// an empty listing.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] when no candidate is present and
    /// [`ResolveError::Enumeration`] when the directory cannot be listed.
    pub fn resolve(&self, volume_id: &VolumeId) -> Result<Utf8PathBuf, ResolveError> {
        let entries = self.list_entries()?;

        let found = candidate_names(volume_id)
            .into_iter()
            .find(|candidate| entries.contains(candidate));

        if let Some(name) = found {
            let device_path = self.by_id_dir.join(&name);
            debug!(%volume_id, device = %name, %device_path, "found attached disk");
            return Ok(device_path);
        }

        debug!(%volume_id, dir = %self.by_id_dir, "no device matched volume serial");
        Err(ResolveError::NotFound {
            volume_id: volume_id.to_string(),
        })
    }

    fn list_entries(&self) -> Result<BTreeSet<String>, ResolveError> {
        let enumeration = |source: io::Error| ResolveError::Enumeration {
            dir: self.by_id_dir.clone(),
            source,
        };

        let dir = match Dir::open_ambient_dir(&self.by_id_dir, ambient_authority()) {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %self.by_id_dir, "by-id directory missing, treating as empty");
                return Ok(BTreeSet::new());
            }
            Err(err) => return Err(enumeration(err)),
        };

        let mut names = BTreeSet::new();
        for item in dir.entries().map_err(enumeration)? {
            let entry = item.map_err(enumeration)?;
            match entry.file_name() {
                Ok(name) => {
                    names.insert(name);
                }
                Err(err) => warn!(dir = %self.by_id_dir, error = %err, "skipping unreadable entry"),
            }
        }
        Ok(names)
    }
}

impl Default for DeviceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_BY_ID_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn volume_id() -> VolumeId {
        VolumeId::new("6f1c6a52-8d9e-4b8e-9b4a-3c2d1e0f9a8b").expect("valid id")
    }

    #[rstest]
    fn candidate_names_follow_priority_order(volume_id: VolumeId) {
        assert_eq!(
            candidate_names(&volume_id),
            [
                String::from("virtio-6f1c6a52-8d9e-4b8e-9"),
                String::from("scsi-0QEMU_QEMU_HARDDISK_6f1c6a52-8d9e-4b8e-9"),
                String::from("wwn-0x6f1c6a528d9e4b8e9b4a3c2d1e0f9a8b"),
            ]
        );
    }

    #[rstest]
    fn candidate_names_are_deterministic(volume_id: VolumeId) {
        assert_eq!(candidate_names(&volume_id), candidate_names(&volume_id));
    }

    #[test]
    fn wwn_candidate_without_hyphens_is_unchanged() {
        let id = VolumeId::new("600508b1001c4d2a9e3f").expect("valid id");
        assert_eq!(
            DeviceConvention::Wwn.device_name(&id),
            "wwn-0x600508b1001c4d2a9e3f"
        );
    }

    #[test]
    fn default_resolver_scans_dev_disk_by_id() {
        assert_eq!(
            DeviceResolver::default().by_id_dir(),
            Utf8Path::new("/dev/disk/by-id")
        );
    }

    #[test]
    fn not_found_message_names_serial_lookup() {
        let err = ResolveError::NotFound {
            volume_id: String::from("vol"),
        };
        assert_eq!(
            err.to_string(),
            "device not found for volume vol by serial identifier"
        );
    }
}
