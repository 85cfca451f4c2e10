//! Resource Listing Snapshot
//!
//! Decoded form of `linstor -m ls-rsc`. The reply is an array of per-node
//! response objects, each carrying resource states (what DRBD reports) and
//! resources (what the controller has placed). Snapshots are never cached.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Listing Types
// =============================================================================

/// One response object of the resource listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceListing {
    #[serde(default)]
    pub resource_states: Vec<ResourceState>,
    #[serde(default)]
    pub resources: Vec<ResourceInfo>,
}

/// Runtime state of a resource on one node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default)]
    pub requires_adjust: bool,
    #[serde(default)]
    pub rsc_name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub vlm_states: Vec<VolumeState>,
    #[serde(default)]
    pub is_present: bool,
    #[serde(default)]
    pub node_name: String,
}

/// Disk and metadata state of one volume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    #[serde(default)]
    pub has_disk: bool,
    #[serde(default)]
    pub check_meta_data: bool,
    #[serde(default)]
    pub has_meta_data: bool,
    #[serde(default)]
    pub is_present: bool,
    #[serde(default)]
    pub disk_failed: bool,
    #[serde(default)]
    pub net_size: u64,
    #[serde(default)]
    pub vlm_minor_nr: u32,
    #[serde(default)]
    pub gross_size: u64,
    #[serde(default)]
    pub vlm_nr: u32,
}

/// Placement of a resource on a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(default)]
    pub vlms: Vec<VolumeInfo>,
    #[serde(default)]
    pub node_uuid: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub props: Vec<Prop>,
    #[serde(default)]
    pub rsc_dfn_uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rsc_flags: Vec<String>,
}

/// Placed volume with its storage pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    #[serde(default)]
    pub vlm_nr: u32,
    #[serde(default)]
    pub stor_pool_name: String,
    #[serde(default)]
    pub stor_pool_uuid: String,
    #[serde(default)]
    pub vlm_minor_nr: u32,
    #[serde(default)]
    pub vlm_uuid: String,
    #[serde(default)]
    pub vlm_dfn_uuid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prop {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of the global resource listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSnapshot(pub Vec<ResourceListing>);

impl ResourceSnapshot {
    /// Decode the listing from raw command output
    pub fn decode(command: &str, raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| Error::Decode {
            command: command.to_string(),
            reason: format!("{}: {}", e, String::from_utf8_lossy(raw)),
        })
    }

    /// All placement records across every response object
    pub fn resources(&self) -> impl Iterator<Item = &ResourceInfo> {
        self.0.iter().flat_map(|l| l.resources.iter())
    }

    /// All runtime state records across every response object
    pub fn resource_states(&self) -> impl Iterator<Item = &ResourceState> {
        self.0.iter().flat_map(|l| l.resource_states.iter())
    }

    /// A resource definition with this name is placed on some node
    pub fn contains(&self, name: &str) -> bool {
        self.resources().any(|r| r.name == name)
    }

    /// The resource is placed on exactly this node
    pub fn on_node(&self, name: &str, node: &str) -> bool {
        self.resources()
            .any(|r| r.name == name && r.node_name == node)
    }

    /// Volume 0 of the resource on this node has no local disk
    ///
    /// Missing records mean "not a client".
    pub fn is_client(&self, name: &str, node: &str) -> bool {
        self.resource_states()
            .filter(|s| s.rsc_name == name && s.node_name == node)
            .find_map(ResourceState::volume_zero)
            .map(|v| !v.has_disk)
            .unwrap_or(false)
    }

    /// Volume 0 state of the first runtime record for this resource
    ///
    /// Matches by resource name only, whatever node the record belongs to.
    pub fn first_volume_zero(&self, name: &str) -> Option<&VolumeState> {
        self.resource_states()
            .filter(|s| s.rsc_name == name)
            .find_map(ResourceState::volume_zero)
    }
}

impl ResourceState {
    /// The representative volume of a resource
    pub fn volume_zero(&self) -> Option<&VolumeState> {
        self.vlm_states.iter().find(|v| v.vlm_nr == 0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;

    /// Listing with r0 on node-a (disk, minor 7), node-b (diskless) and
    /// r1 on node-b only
    pub fn listing() -> String {
        json!([{
            "resource_states": [
                {
                    "requires_adjust": false, "rsc_name": "r0", "is_primary": false,
                    "is_present": true, "node_name": "node-a",
                    "vlm_states": [
                        {"vlm_nr": 1, "vlm_minor_nr": 8, "has_disk": true},
                        {"vlm_nr": 0, "vlm_minor_nr": 7, "has_disk": true,
                         "has_meta_data": true, "net_size": 1048576, "gross_size": 1049600}
                    ]
                },
                {
                    "rsc_name": "r0", "is_present": true, "node_name": "node-b",
                    "vlm_states": [{"vlm_nr": 0, "vlm_minor_nr": 7, "has_disk": false}]
                },
                {
                    "rsc_name": "r1", "is_present": true, "node_name": "node-b",
                    "vlm_states": [{"vlm_nr": 0, "vlm_minor_nr": 0, "has_disk": true}]
                }
            ],
            "resources": [
                {
                    "name": "r0", "node_name": "node-a", "uuid": "u-1", "node_uuid": "n-1",
                    "rsc_dfn_uuid": "d-1",
                    "vlms": [{"vlm_nr": 0, "stor_pool_name": "drbdpool", "vlm_minor_nr": 7}],
                    "props": [{"key": "StorPoolName", "value": "drbdpool"}]
                },
                {
                    "name": "r0", "node_name": "node-b",
                    "rsc_flags": ["DISKLESS"],
                    "vlms": [{"vlm_nr": 0, "stor_pool_name": "DfltDisklessStorPool", "vlm_minor_nr": 7}]
                },
                {"name": "r1", "node_name": "node-b", "vlms": []}
            ]
        }])
        .to_string()
    }
}
