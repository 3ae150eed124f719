//! Configuration loading via `ortho-config`.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::device::DeviceResolver;
use crate::identity::DefaultNodeResponder;

/// Node plugin configuration derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "CINDER_NODE",
    discovery(
        app_name = "cinder-node",
        env_var = "CINDER_NODE_CONFIG_PATH",
        config_file_name = "cinder-node.toml",
        dotfile_name = ".cinder-node.toml",
        project_file_name = "cinder-node.toml"
    )
)]
pub struct NodeConfig {
    /// Identifier reported when the mount provider returns no instance ID.
    pub node_id: String,
    /// Directory of identifier-keyed device symlinks. Defaults to
    /// `/dev/disk/by-id`.
    #[ortho_config(default = "/dev/disk/by-id".to_owned())]
    pub by_id_dir: String,
}

impl NodeConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("cinder-node")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the environment variable
    /// and TOML key when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::MissingField(String::from(
                "missing fallback node ID: set CINDER_NODE_NODE_ID or add node_id to cinder-node.toml",
            )));
        }
        if self.by_id_dir.trim().is_empty() {
            return Err(ConfigError::MissingField(String::from(
                "missing device directory: set CINDER_NODE_BY_ID_DIR or add by_id_dir to cinder-node.toml",
            )));
        }
        Ok(())
    }

    /// Builds a resolver scanning the configured device directory.
    #[must_use]
    pub fn device_resolver(&self) -> DeviceResolver {
        DeviceResolver::new(self.by_id_dir.trim())
    }

    /// Builds the fallback identity responder.
    #[must_use]
    pub fn default_responder(&self) -> DefaultNodeResponder {
        DefaultNodeResponder::new(self.node_id.trim())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
