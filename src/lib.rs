//! DRBD Volume Manager - LINSTOR client-side orchestration
//!
//! Manages replicated block volumes through the LINSTOR command-line client:
//! reserving resource definitions, placing them on nodes as disk-backed
//! replicas or diskless clients, finding the local DRBD device, and safely
//! formatting and mounting it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          VolumeManager                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌────────────────┐  │
//! │  │ ResourceManager  │  │DevicePathResolver│─▶│  Filesystem    │  │
//! │  │ create / assign  │  │  poll /dev/drbdN │  │  Manager       │  │
//! │  └────────┬─────────┘  └────────┬─────────┘  └───────┬────────┘  │
//! │           └────────────┬────────┘                    │           │
//! │              ┌─────────┴─────────┐                   │           │
//! │              │   LinstorClient   │                   │           │
//! │              │ status + snapshot │                   │           │
//! │              └─────────┬─────────┘                   │           │
//! ├────────────────────────┴─────────────────────────────┴───────────┤
//! │        CommandExecutor (linstor, blkid, mkfs, mount)             │
//! │        DeviceLookup (lstat)                                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All calls block the calling thread. No state is shared between calls:
//! every query fetches a fresh listing.
//!
//! # Modules
//!
//! - [`controlplane`]: LINSTOR client, status validation, listing, lifecycle
//! - [`device`]: Device path resolution, formatting and mounting
//! - [`domain`]: Host ports (command execution, device probing)
//! - [`config`]: File configuration
//! - [`error`]: Error types and handling

pub mod config;
pub mod controlplane;
pub mod device;
pub mod domain;
pub mod error;
pub mod manager;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{Config, ControlPlaneConfig, DeviceConfig, FilesystemConfig, LifecycleConfig};

pub use controlplane::{
    is_success, LinstorClient, ManagerConfig, Resource, ResourceManager, ResourceSnapshot,
    ReturnStatuses, StatusMessage, MASK_ERROR, MASK_INFO, MASK_WARN,
};

pub use device::{device_path, parse_fs_type, DevicePathResolver, FilesystemManager, ResolverConfig};

pub use domain::ports::{
    CommandExecutor, CommandOutput, DeviceLookup, LocalDevices, SystemExecutor,
};

pub use error::{Error, ErrorAction, Result};

pub use manager::VolumeManager;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
