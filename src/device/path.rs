//! Device Path Resolution
//!
//! After a resource is assigned the kernel attaches the DRBD device some
//! seconds later. The resolver reads volume 0's minor number from a fresh
//! listing, builds the device path and polls until the path exists.

use crate::config::Config;
use crate::controlplane::client::LinstorClient;
use crate::domain::ports::DeviceLookup;
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Conventional DRBD device path for a minor number
pub fn device_path(prefix: &str, minor: u32) -> String {
    format!("{}{}", prefix, minor)
}

/// Runtime settings for the resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Device path prefix
    pub path_prefix: String,
    /// Fixed wait between attempts
    pub poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/dev/drbd".to_string(),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for ResolverConfig {
    fn from(config: &Config) -> Self {
        Self {
            path_prefix: config.device.path_prefix.clone(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Finds the local block device backing a resource
#[derive(Clone)]
pub struct DevicePathResolver {
    client: LinstorClient,
    devices: Arc<dyn DeviceLookup>,
    config: ResolverConfig,
}

impl DevicePathResolver {
    pub fn new(client: LinstorClient, devices: Arc<dyn DeviceLookup>, config: ResolverConfig) -> Self {
        Self {
            client,
            devices,
            config,
        }
    }

    /// One resolution attempt
    ///
    /// Takes the first runtime record with a matching name regardless of
    /// node, so on a listing spanning several nodes it may read another
    /// node's record.
    pub fn dev_path(&self, resource: &str) -> Result<String> {
        let snapshot = self.client.list_resources()?;
        let volume = snapshot
            .first_volume_zero(resource)
            .ok_or_else(|| Error::VolumeNotFound {
                resource: resource.to_string(),
            })?;

        let path = device_path(&self.config.path_prefix, volume.vlm_minor_nr);
        self.devices
            .stat(Path::new(&path))
            .map_err(|e| Error::DeviceNotFound {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(path)
    }

    /// Poll until the device path exists, at most `max_retries` attempts
    ///
    /// Returns the last attempt's error once the budget is spent.
    pub fn wait_for_dev_path(&self, resource: &str, max_retries: u32) -> Result<String> {
        let mut last_err = None;

        for attempt in 1..=max_retries {
            match self.dev_path(resource) {
                Ok(path) => {
                    info!("Resource {} attached at {}", resource, path);
                    return Ok(path);
                }
                Err(e) => {
                    debug!(
                        "Device for {} not ready (attempt {}/{}): {}",
                        resource, attempt, max_retries, e
                    );
                    last_err = Some(e);
                }
            }

            if attempt < max_retries {
                std::thread::sleep(self.config.poll_interval);
            }
        }

        warn!("Gave up waiting for device of resource {}", resource);
        Err(last_err.unwrap_or_else(|| Error::DevicePathTimeout {
            resource: resource.to_string(),
            attempts: max_retries,
        }))
    }
}
