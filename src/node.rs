//! Node service surface consumed by an RPC dispatcher.
//!
//! Request and response shapes mirror the CSI node service and deserialise
//! with serde, so a dispatcher only needs to decode the wire message, call
//! the matching [`NodeService`] method, and map [`NodeError::kind`] onto a
//! status code.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ConfigError, NodeConfig};
use crate::device::DeviceResolver;
use crate::identity::{DefaultNodeResponder, NodeCapability, NodeIdentity, node_capabilities};
use crate::mount::{MountOrchestrator, NodeError, PublishRequest};
use crate::provider::{MountProviderSource, ProviderError};
use crate::volume::VolumeId;

/// Filesystem layout requested for a mounted volume.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct MountVolume {
    /// Filesystem type, for example `ext4`.
    pub fs_type: String,
    /// Extra mount flags in the order they should be applied.
    pub mount_flags: Vec<String>,
}

/// Capability requested for a volume.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct VolumeCapability {
    /// Mount access type, absent for raw block access.
    pub mount: Option<MountVolume>,
}

/// Request to publish a volume at a target path.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct NodePublishVolumeRequest {
    /// Backend volume identifier.
    pub volume_id: String,
    /// Mount point on the host.
    pub target_path: String,
    /// Requested capability.
    pub volume_capability: Option<VolumeCapability>,
    /// Mount read-only when `true`.
    pub readonly: bool,
}

/// Request to unpublish a volume from a target path.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct NodeUnpublishVolumeRequest {
    /// Backend volume identifier.
    pub volume_id: String,
    /// Mount point on the host.
    pub target_path: String,
}

/// Request to stage a volume. Accepted and ignored.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct NodeStageVolumeRequest {
    /// Backend volume identifier.
    pub volume_id: String,
    /// Staging path on the host.
    pub staging_target_path: String,
    /// Requested capability.
    pub volume_capability: Option<VolumeCapability>,
}

/// Request to unstage a volume. Accepted and ignored.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct NodeUnstageVolumeRequest {
    /// Backend volume identifier.
    pub volume_id: String,
    /// Staging path on the host.
    pub staging_target_path: String,
}

/// Empty publish response.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodePublishVolumeResponse {}

/// Empty unpublish response.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeUnpublishVolumeResponse {}

/// Empty stage response.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeStageVolumeResponse {}

/// Empty unstage response.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeUnstageVolumeResponse {}

/// Answer to the legacy node ID query.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeGetIdResponse {
    /// Identifier of this node.
    pub node_id: String,
}

/// Answer to the node info query.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeGetInfoResponse {
    /// Identifier of this node.
    pub node_id: String,
}

/// Answer to the capability query.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeGetCapabilitiesResponse {
    /// Advertised capabilities.
    pub capabilities: Vec<NodeCapability>,
}

/// Node service composing mount orchestration and identity lookups.
#[derive(Debug)]
pub struct NodeService<S> {
    mounter: MountOrchestrator<S>,
    identity: NodeIdentity<S>,
    fallback: DefaultNodeResponder,
}

impl<S: MountProviderSource + Clone> NodeService<S> {
    /// Creates a node service sharing `source` between mounts and identity
    /// lookups.
    #[must_use]
    pub fn new(source: S, resolver: DeviceResolver, fallback: DefaultNodeResponder) -> Self {
        Self {
            mounter: MountOrchestrator::new(source.clone(), resolver),
            identity: NodeIdentity::new(source),
            fallback,
        }
    }

    /// Creates a node service from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn from_config(source: S, config: &NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            source,
            config.device_resolver(),
            config.default_responder(),
        ))
    }
}

impl<S: MountProviderSource> NodeService<S> {
    /// Orchestrator behind the publish calls.
    #[must_use]
    pub const fn mounter(&self) -> &MountOrchestrator<S> {
        &self.mounter
    }

    /// Publishes a volume.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument [`NodeError`] for malformed requests and
    /// otherwise whatever [`MountOrchestrator::publish`] returns.
    pub async fn node_publish_volume(
        &self,
        request: NodePublishVolumeRequest,
    ) -> Result<NodePublishVolumeResponse, NodeError<ProviderError<S>>> {
        let publish = publish_request(request)?;
        self.mounter.publish(&publish).await?;
        Ok(NodePublishVolumeResponse {})
    }

    /// Unpublishes a volume.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument [`NodeError`] for malformed requests and
    /// otherwise whatever [`MountOrchestrator::unpublish`] returns.
    pub async fn node_unpublish_volume(
        &self,
        request: NodeUnpublishVolumeRequest,
    ) -> Result<NodeUnpublishVolumeResponse, NodeError<ProviderError<S>>> {
        if request.volume_id.is_empty() {
            return Err(NodeError::InvalidArgument(String::from("volume id is required")));
        }
        let target_path = parse_target_path(request.target_path)?;
        self.mounter.unpublish(&target_path).await?;
        Ok(NodeUnpublishVolumeResponse {})
    }

    /// Accepts a stage request without touching the host.
    #[must_use]
    pub const fn node_stage_volume(
        &self,
        _request: &NodeStageVolumeRequest,
    ) -> NodeStageVolumeResponse {
        NodeStageVolumeResponse {}
    }

    /// Accepts an unstage request without touching the host.
    #[must_use]
    pub const fn node_unstage_volume(
        &self,
        _request: &NodeUnstageVolumeRequest,
    ) -> NodeUnstageVolumeResponse {
        NodeUnstageVolumeResponse {}
    }

    /// Returns the provider's instance ID, or the fallback answer when it is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unwrapped when the lookup fails.
    pub async fn node_get_id(&self) -> Result<NodeGetIdResponse, ProviderError<S>> {
        let node_id = self.identity.node_id().await?;
        if node_id.is_empty() {
            debug!("provider reported no instance ID, using default responder");
            return Ok(self.fallback.node_get_id());
        }
        Ok(NodeGetIdResponse { node_id })
    }

    /// Returns node info carrying the provider's instance ID, or the fallback
    /// answer when it is empty.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unwrapped when the lookup fails.
    pub async fn node_get_info(&self) -> Result<NodeGetInfoResponse, ProviderError<S>> {
        let node_id = self.identity.node_id().await?;
        if node_id.is_empty() {
            debug!("provider reported no instance ID, using default responder");
            return Ok(self.fallback.node_get_info());
        }
        Ok(NodeGetInfoResponse { node_id })
    }

    /// Returns the fixed capability list.
    #[must_use]
    pub fn node_get_capabilities(&self) -> NodeGetCapabilitiesResponse {
        NodeGetCapabilitiesResponse {
            capabilities: node_capabilities(),
        }
    }
}

fn publish_request<E>(request: NodePublishVolumeRequest) -> Result<PublishRequest, NodeError<E>>
where
    E: std::error::Error + 'static,
{
    let volume_id = VolumeId::new(request.volume_id)?;
    let target_path = parse_target_path(request.target_path)?;
    let mount = request
        .volume_capability
        .and_then(|capability| capability.mount)
        .unwrap_or_default();

    Ok(PublishRequest {
        volume_id,
        target_path,
        fs_type: mount.fs_type,
        read_only: request.readonly,
        mount_flags: mount.mount_flags,
    })
}

fn parse_target_path<E>(value: String) -> Result<Utf8PathBuf, NodeError<E>>
where
    E: std::error::Error + 'static,
{
    if value.is_empty() {
        return Err(NodeError::InvalidArgument(String::from("target path is required")));
    }
    Ok(Utf8PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::ErrorKind;
    use crate::test_support::ScriptedProviderError;

    const VOLUME_ID: &str = "6f1c6a52-8d9e-4b8e-9b4a-3c2d1e0f9a8b";

    #[test]
    fn publish_request_carries_capability_fields() {
        let request = NodePublishVolumeRequest {
            volume_id: VOLUME_ID.to_owned(),
            target_path: String::from("/var/lib/kubelet/pods/p/volumes/v"),
            volume_capability: Some(VolumeCapability {
                mount: Some(MountVolume {
                    fs_type: String::from("xfs"),
                    mount_flags: vec![String::from("noatime")],
                }),
            }),
            readonly: true,
        };
        let publish =
            publish_request::<ScriptedProviderError>(request).expect("request should convert");
        assert_eq!(publish.fs_type, "xfs");
        assert_eq!(publish.mount_flags, vec![String::from("noatime")]);
        assert!(publish.read_only);
    }

    #[test]
    fn publish_request_tolerates_missing_capability() {
        let request = NodePublishVolumeRequest {
            volume_id: VOLUME_ID.to_owned(),
            target_path: String::from("/mnt/target"),
            ..NodePublishVolumeRequest::default()
        };
        let publish =
            publish_request::<ScriptedProviderError>(request).expect("request should convert");
        assert!(publish.fs_type.is_empty());
        assert!(publish.mount_flags.is_empty());
    }

    #[test]
    fn publish_request_rejects_short_volume_id() {
        let request = NodePublishVolumeRequest {
            volume_id: String::from("vol-1"),
            target_path: String::from("/mnt/target"),
            ..NodePublishVolumeRequest::default()
        };
        let err = publish_request::<ScriptedProviderError>(request).expect_err("short id");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn publish_request_rejects_empty_target() {
        let request = NodePublishVolumeRequest {
            volume_id: VOLUME_ID.to_owned(),
            ..NodePublishVolumeRequest::default()
        };
        let err = publish_request::<ScriptedProviderError>(request).expect_err("empty target");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "invalid argument: target path is required");
    }

    #[test]
    fn publish_request_decodes_from_json_with_defaults() {
        let json = r#"{
            "volume_id": "6f1c6a52-8d9e-4b8e-9b4a-3c2d1e0f9a8b",
            "target_path": "/mnt/target",
            "volume_capability": {"mount": {"fs_type": "ext4"}}
        }"#;
        let request: NodePublishVolumeRequest =
            serde_json::from_str(json).expect("request should decode");
        assert!(!request.readonly);
        let mount = request
            .volume_capability
            .and_then(|capability| capability.mount)
            .expect("mount capability");
        assert_eq!(mount.fs_type, "ext4");
        assert!(mount.mount_flags.is_empty());
    }
}
