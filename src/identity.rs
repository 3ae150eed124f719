//! Node identity and capability reporting.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::node::{NodeGetIdResponse, NodeGetInfoResponse};
use crate::provider::{MountProvider, MountProviderSource, ProviderError};

/// Resolves this host's identifier from the mount provider on every call.
#[derive(Debug)]
pub struct NodeIdentity<S> {
    source: S,
}

impl<S: MountProviderSource> NodeIdentity<S> {
    /// Creates a resolver backed by `source`.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the provider's instance ID, which may be empty.
    ///
    /// # Errors
    ///
    /// Returns the provider's own error when acquisition or the lookup
    /// fails.
    pub async fn node_id(&self) -> Result<String, ProviderError<S>> {
        let provider = self
            .source
            .mount_provider()
            .inspect_err(|err| debug!(error = %err, "mount provider unavailable"))?;
        provider
            .instance_id()
            .await
            .inspect_err(|err| debug!(error = %err, "instance ID lookup failed"))
    }
}

/// Generic identity answers used when the provider reports no instance ID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DefaultNodeResponder {
    node_id: String,
}

impl DefaultNodeResponder {
    /// Creates a responder reporting `node_id`.
    #[must_use]
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }

    /// Answers the legacy single-ID query.
    #[must_use]
    pub fn node_get_id(&self) -> NodeGetIdResponse {
        NodeGetIdResponse {
            node_id: self.node_id.clone(),
        }
    }

    /// Answers the combined info query.
    #[must_use]
    pub fn node_get_info(&self) -> NodeGetInfoResponse {
        NodeGetInfoResponse {
            node_id: self.node_id.clone(),
        }
    }
}

/// RPC-level node capabilities.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcCapability {
    /// No specific capability.
    Unknown,
    /// Separate stage and unstage steps.
    StageUnstageVolume,
}

/// Capability advertised by the node service.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCapability {
    /// An RPC capability.
    Rpc(RpcCapability),
}

/// Capabilities this node advertises: a single capability of unknown type,
/// so no staging step is requested.
#[must_use]
pub fn node_capabilities() -> Vec<NodeCapability> {
    vec![NodeCapability::Rpc(RpcCapability::Unknown)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedFailure, ScriptedMountProvider, ScriptedProviderError};

    #[tokio::test]
    async fn node_id_returns_provider_instance_id() {
        let provider = ScriptedMountProvider::new();
        provider.set_instance_id("i-0abc");
        let identity = NodeIdentity::new(provider);
        assert_eq!(identity.node_id().await, Ok(String::from("i-0abc")));
    }

    #[tokio::test]
    async fn node_id_propagates_lookup_failure_unwrapped() {
        let provider = ScriptedMountProvider::new();
        provider.fail(ScriptedFailure::InstanceId);
        let identity = NodeIdentity::new(provider);
        assert_eq!(
            identity.node_id().await,
            Err(ScriptedProviderError::InstanceId)
        );
    }

    #[tokio::test]
    async fn node_id_propagates_acquisition_failure() {
        let provider = ScriptedMountProvider::new();
        provider.fail(ScriptedFailure::Acquire);
        let identity = NodeIdentity::new(provider.clone());
        assert_eq!(identity.node_id().await, Err(ScriptedProviderError::Acquire));
        assert!(provider.calls().is_empty());
    }

    #[test]
    fn capabilities_advertise_only_unknown() {
        assert_eq!(
            node_capabilities(),
            vec![NodeCapability::Rpc(RpcCapability::Unknown)]
        );
    }
}
