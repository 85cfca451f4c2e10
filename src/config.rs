//! Configuration
//!
//! File-level settings loaded from YAML. Every field has a default so an
//! empty file (or no file) is a valid configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub control_plane: ControlPlaneConfig,
    pub lifecycle: LifecycleConfig,
    pub device: DeviceConfig,
    pub filesystem: FilesystemConfig,
}

/// How to reach the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Client binary
    pub binary: String,
    /// Controller list passed as `--controllers`
    pub controllers: Option<String>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            binary: "linstor".to_string(),
            controllers: None,
        }
    }
}

/// Resource lifecycle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Wait between creating the resource definition and its volume definition
    pub definition_settle_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            definition_settle_secs: 2,
        }
    }
}

/// Local device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device path prefix, followed by the volume minor number
    pub path_prefix: String,
    /// Wait between device path polls
    pub poll_interval_secs: u64,
    /// Device path polls made by mount
    pub mount_retries: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/dev/drbd".to_string(),
            poll_interval_secs: 2,
            mount_retries: 3,
        }
    }
}

/// Filesystem settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    /// Filesystem created on unformatted devices
    pub fs_type: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            fs_type: "ext4".to_string(),
        }
    }
}

impl Config {
    /// Load from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse from YAML text
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.control_plane.binary.is_empty() {
            return Err(Error::Configuration("control_plane.binary is empty".into()));
        }
        if self.device.path_prefix.is_empty() {
            return Err(Error::Configuration("device.path_prefix is empty".into()));
        }
        if self.filesystem.fs_type.is_empty() {
            return Err(Error::Configuration("filesystem.fs_type is empty".into()));
        }
        Ok(())
    }

    pub fn definition_settle_delay(&self) -> Duration {
        Duration::from_secs(self.lifecycle.definition_settle_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.device.poll_interval_secs)
    }
}
