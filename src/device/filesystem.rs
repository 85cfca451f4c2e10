//! Filesystem Formatting and Mounting
//!
//! Formats a resource's device only when it is blank and mounts it. A device
//! that already carries a different filesystem is never reformatted.

use crate::device::path::DevicePathResolver;
use crate::domain::ports::{CommandExecutor, CommandLine, CommandOutput};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// udev attribute naming the filesystem type
pub const FS_TYPE_KEY: &str = "ID_FS_TYPE";

/// Extract the filesystem type from `blkid -o udev` output
///
/// No tokens at all means no filesystem and yields an empty string.
pub fn parse_fs_type(blkid: &str) -> Result<String> {
    let tokens: Vec<&str> = blkid.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(String::new());
    }

    let mut attrs = BTreeMap::new();
    for token in tokens {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            Error::FilesystemInfo(format!("couldn't parse filesystem data from {:?}", blkid))
        })?;
        attrs.insert(key, value);
    }

    attrs
        .get(FS_TYPE_KEY)
        .map(|fs| fs.to_string())
        .ok_or_else(|| Error::FilesystemInfo(format!("couldn't find {} in {:?}", FS_TYPE_KEY, attrs)))
}

/// Formats and mounts resource devices
pub struct FilesystemManager {
    executor: Arc<dyn CommandExecutor>,
    resolver: DevicePathResolver,
    mount_retries: u32,
}

impl FilesystemManager {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        resolver: DevicePathResolver,
        mount_retries: u32,
    ) -> Self {
        Self {
            executor,
            resolver,
            mount_retries,
        }
    }

    /// Run a host utility, failing on launch errors and non-zero exits
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let command = CommandLine(program, &args).to_string();
        debug!("exec: {}", command);

        let output = self
            .executor
            .execute(program, &args)
            .map_err(|e| Error::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;
        if !output.success {
            return Err(Error::CommandFailed {
                command,
                reason: output.text().trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run a host utility and report only whether it exited zero
    fn check(&self, program: &str, args: &[&str]) -> Result<bool> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let output = self
            .executor
            .execute(program, &args)
            .map_err(|e| Error::CommandFailed {
                command: CommandLine(program, &args).to_string(),
                reason: e.to_string(),
            })?;
        Ok(output.success)
    }

    /// Current filesystem type of a device, empty if unformatted
    ///
    /// blkid exits non-zero without output on a blank device, so the exit
    /// status is ignored and only the output is parsed.
    pub fn check_fs_type(&self, device: &str) -> Result<String> {
        let args = vec!["-o".to_string(), "udev".to_string(), device.to_string()];
        let output = self
            .executor
            .execute("blkid", &args)
            .map_err(|e| Error::CommandFailed {
                command: CommandLine("blkid", &args).to_string(),
                reason: e.to_string(),
            })?;
        parse_fs_type(&output.text())
    }

    /// Create `fs_type` on the device unless it is already there
    ///
    /// Fails rather than overwrite a different filesystem.
    pub fn safe_format(&self, device: &str, fs_type: &str) -> Result<()> {
        let found = self.check_fs_type(device)?;

        if found == fs_type {
            debug!("{} already formatted with {}", device, fs_type);
            return Ok(());
        }

        if !found.is_empty() {
            return Err(Error::ForeignFilesystem {
                device: device.to_string(),
                found,
                wanted: fs_type.to_string(),
            });
        }

        info!("Creating {} filesystem on {}", fs_type, device);
        self.run("mkfs", &["-t", fs_type, device])?;
        Ok(())
    }

    /// Resolve the resource's device, format it if blank, and mount it on `path`
    pub fn mount(&self, resource: &str, fs_type: &str, path: &str) -> Result<()> {
        let device = self
            .resolver
            .wait_for_dev_path(resource, self.mount_retries)
            .map_err(|e| e.in_operation("mount: resolve device path", resource, None))?;

        self.safe_format(&device, fs_type)
            .map_err(|e| e.in_operation("mount: format", resource, None))?;

        self.run("mkdir", &["-p", path])
            .map_err(|e| e.in_operation("mount: create mount directory", resource, None))?;

        info!("Mounting {} on {}", device, path);
        self.run("mount", &[&device, path])
            .map_err(|e| e.in_operation("mount", resource, None))?;

        Ok(())
    }

    /// Unmount `path`; a missing or unmounted path is not an error
    pub fn unmount(&self, path: &str) -> Result<()> {
        if !self.check("test", &["-d", path])? {
            debug!("{} is not a directory, nothing to unmount", path);
            return Ok(());
        }

        if !self.check("findmnt", &["-f", path])? {
            debug!("{} is not mounted", path);
            return Ok(());
        }

        info!("Unmounting {}", path);
        self.run("umount", &[path])
            .map_err(|e| e.in_operation("unmount", path, None))?;
        Ok(())
    }
}
