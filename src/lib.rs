//! Node-side volume publishing for a block storage plugin.
//!
//! The crate resolves an attached block device from a volume identifier,
//! checks whether a target path is already mounted, and drives an external
//! mount provider through idempotent publish and unpublish transitions. It
//! also answers node identity and capability queries. Transport, the mount
//! provider itself, and device attachment live outside this crate.

pub mod config;
pub mod device;
pub mod identity;
pub mod mount;
pub mod node;
pub mod provider;
pub mod test_support;
pub mod volume;

pub use config::{ConfigError, NodeConfig};
pub use device::{DeviceConvention, DeviceResolver, ResolveError, candidate_names};
pub use identity::{DefaultNodeResponder, NodeCapability, NodeIdentity, RpcCapability};
pub use mount::{ErrorKind, MountOrchestrator, MountState, NodeError, PublishRequest, TargetLocks};
pub use node::{
    MountVolume, NodeGetCapabilitiesResponse, NodeGetIdResponse, NodeGetInfoResponse,
    NodePublishVolumeRequest, NodePublishVolumeResponse, NodeService, NodeStageVolumeRequest,
    NodeStageVolumeResponse, NodeUnpublishVolumeRequest, NodeUnpublishVolumeResponse,
    NodeUnstageVolumeRequest, NodeUnstageVolumeResponse, VolumeCapability,
};
pub use provider::{MountProvider, MountProviderSource, ProviderError, ProviderFuture};
pub use volume::{MountOptions, VolumeId, VolumeIdError};
