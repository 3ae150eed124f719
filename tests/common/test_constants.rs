//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Volume identifier with embedded hyphens.
pub const VOLUME_ID: &str = "6f1c6a52-8d9e-4b8e-9b4a-3c2d1e0f9a8b";

/// By-id entry a virtio-blk disk exposes for [`VOLUME_ID`].
pub const VIRTIO_NAME: &str = "virtio-6f1c6a52-8d9e-4b8e-9";

/// By-id entry a virtio-scsi disk exposes for [`VOLUME_ID`].
pub const SCSI_NAME: &str = "scsi-0QEMU_QEMU_HARDDISK_6f1c6a52-8d9e-4b8e-9";

/// By-id entry an ESXi disk exposes for [`VOLUME_ID`].
pub const WWN_NAME: &str = "wwn-0x6f1c6a528d9e4b8e9b4a3c2d1e0f9a8b";

/// Target path used by publish scenarios.
pub const TARGET_PATH: &str = "/var/lib/kubelet/pods/pod-1/volumes/kubernetes.io~csi/data/mount";
