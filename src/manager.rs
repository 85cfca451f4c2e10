//! Volume Manager
//!
//! Wires the lifecycle manager, device path resolver and filesystem manager
//! to one set of host adapters.

use crate::config::Config;
use crate::controlplane::client::LinstorClient;
use crate::controlplane::resource::{ManagerConfig, ResourceManager};
use crate::device::filesystem::FilesystemManager;
use crate::device::path::{DevicePathResolver, ResolverConfig};
use crate::domain::ports::{CommandExecutor, DeviceLookup, LocalDevices, SystemExecutor};
use std::sync::Arc;

/// All volume operations sharing one executor and configuration
pub struct VolumeManager {
    config: Config,
    resources: ResourceManager,
    resolver: DevicePathResolver,
    filesystems: FilesystemManager,
}

impl VolumeManager {
    /// Build on the real host: `std::process::Command` and `lstat`
    pub fn system(config: Config) -> Self {
        Self::new(config, Arc::new(SystemExecutor), Arc::new(LocalDevices))
    }

    pub fn new(
        config: Config,
        executor: Arc<dyn CommandExecutor>,
        devices: Arc<dyn DeviceLookup>,
    ) -> Self {
        let client = LinstorClient::new(executor.clone(), config.control_plane.clone());
        let resources = ResourceManager::new(client.clone(), ManagerConfig::from(&config));
        let resolver = DevicePathResolver::new(client, devices, ResolverConfig::from(&config));
        let filesystems =
            FilesystemManager::new(executor, resolver.clone(), config.device.mount_retries);

        Self {
            config,
            resources,
            resolver,
            filesystems,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resolver(&self) -> &DevicePathResolver {
        &self.resolver
    }

    pub fn filesystems(&self) -> &FilesystemManager {
        &self.filesystems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::resource::Resource;
    use crate::controlplane::snapshot::fixtures;
    use crate::domain::ports::CommandOutput;
    use crate::testing::{FakeDevices, FakeExecutor};

    #[test]
    fn test_deploy_then_mount() {
        let mut config = Config::default();
        config.lifecycle.definition_settle_secs = 0;
        config.device.poll_interval_secs = 0;
        config.control_plane.binary = "/opt/linstor/bin/linstor".into();

        let fake = FakeExecutor::new();
        fake.on_ok(&["/opt/linstor/bin/linstor"], r#"[{"ret_code": 0}]"#);
        fake.on_ok(&["/opt/linstor/bin/linstor", "-m", "ls-rsc"], &fixtures::listing());
        fake.on(&["blkid"], CommandOutput::failed(2, ""));
        fake.on_ok(&["mkfs"], "");
        fake.on_ok(&["mkdir"], "");
        fake.on_ok(&["mount"], "");
        let devices = FakeDevices::new();
        devices.present("/dev/drbd7");

        let volumes = VolumeManager::new(config, fake.clone(), devices.clone());
        let resource = Resource {
            name: "r0".into(),
            node_list: vec!["node-a".into()],
            client_list: vec!["node-b".into()],
            storage_pool: "drbdpool".into(),
            size_kib: 4096,
            ..Default::default()
        };

        volumes.resources().create_and_assign(&resource).unwrap();
        volumes
            .filesystems()
            .mount(&resource.name, &volumes.config().filesystem.fs_type, "/mnt/r0")
            .unwrap();

        // both nodes were already placed in the listing
        assert_eq!(fake.count(&["/opt/linstor/bin/linstor", "-m", "create-resource", "r0"]), 0);
        assert_eq!(fake.count(&["mkfs", "-t", "ext4", "/dev/drbd7"]), 1);
        assert_eq!(fake.count(&["mount", "/dev/drbd7", "/mnt/r0"]), 1);
    }
}
