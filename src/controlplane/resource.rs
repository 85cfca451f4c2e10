//! Resource Lifecycle
//!
//! Drives a resource through reserve, assign, unassign and delete:
//!
//! ```text
//! Undefined ──create──▶ Reserved ──assign──▶ Assigned(nodes) ──delete──▶ Deleted
//!                                   ▲   │
//!                                   └───┘ assign / unassign
//! ```
//!
//! Nothing here is transactional. A partially assigned resource is a normal
//! state and re-running `assign` resumes where the last call stopped.

use crate::config::Config;
use crate::controlplane::client::LinstorClient;
use crate::controlplane::snapshot::ResourceSnapshot;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

// =============================================================================
// Resource
// =============================================================================

/// A named, replicated storage volume
///
/// `redundancy` is only meaningful for an initial deployment and `node_name`
/// for single-node operations; neither is read by the lifecycle itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    /// Control-plane scoped name
    pub name: String,
    /// Target node for single-node operations
    pub node_name: String,
    /// Replica count for initial deployment
    pub redundancy: Option<u32>,
    /// Nodes holding a disk-backed replica, in assignment order
    pub node_list: Vec<String>,
    /// Nodes attached as diskless clients, in assignment order
    pub client_list: Vec<String>,
    /// Storage pool for disk-backed replicas
    pub storage_pool: String,
    /// Volume size in KiB
    pub size_kib: u64,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Manager Configuration
// =============================================================================

/// Runtime settings for the lifecycle manager
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Wait for the resource definition to propagate before adding its volume
    pub definition_settle_delay: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            definition_settle_delay: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for ManagerConfig {
    fn from(config: &Config) -> Self {
        Self {
            definition_settle_delay: config.definition_settle_delay(),
        }
    }
}

// =============================================================================
// Resource Manager
// =============================================================================

/// Orchestrates resource lifecycle commands against the control plane
pub struct ResourceManager {
    client: LinstorClient,
    config: ManagerConfig,
}

impl ResourceManager {
    /// Create a new resource manager
    pub fn new(client: LinstorClient, config: ManagerConfig) -> Self {
        Self { client, config }
    }

    /// Reserve the resource name and define its volume
    pub fn create(&self, resource: &Resource) -> Result<()> {
        info!("Reserving resource definition {}", resource.name);
        self.client
            .run(&["create-resource-definition", &resource.name])
            .map_err(|e| e.in_operation("create", &resource.name, None))?;

        if !self.config.definition_settle_delay.is_zero() {
            debug!(
                "Waiting {:?} for definition {} to propagate",
                self.config.definition_settle_delay, resource.name
            );
            std::thread::sleep(self.config.definition_settle_delay);
        }

        let size = format!("{}kib", resource.size_kib);
        info!("Creating volume definition {} ({})", resource.name, size);
        self.client
            .run(&["create-volume-definition", &resource.name, &size])
            .map_err(|e| e.in_operation("create", &resource.name, None))?;

        Ok(())
    }

    /// Place the resource on every listed node that doesn't have it yet
    ///
    /// Disk-backed nodes come first, then diskless clients, each in the order
    /// given. Concurrent callers on the same resource are not coordinated.
    pub fn assign(&self, resource: &Resource) -> Result<()> {
        let defined = self
            .exists(&resource.name)
            .map_err(|e| e.in_operation("assign", &resource.name, None))?;
        if !defined {
            return Err(Error::NoResourceDefinition {
                resource: resource.name.clone(),
            });
        }

        for node in &resource.node_list {
            self.place(resource, node, &["-s", &resource.storage_pool])?;
        }

        for node in &resource.client_list {
            self.place(resource, node, &["--diskless"])?;
        }

        Ok(())
    }

    fn place(&self, resource: &Resource, node: &str, placement: &[&str]) -> Result<()> {
        let present = self
            .on_node(&resource.name, node)
            .map_err(|e| e.in_operation("assign", &resource.name, Some(node)))?;
        if present {
            debug!("Resource {} already on node {}", resource.name, node);
            return Ok(());
        }

        info!(
            "Assigning resource {} to node {} ({})",
            resource.name,
            node,
            placement.join(" ")
        );
        let mut args = vec!["create-resource", resource.name.as_str(), node];
        args.extend_from_slice(placement);
        self.client
            .run(&args)
            .map_err(|e| e.in_operation("assign", &resource.name, Some(node)))?;

        Ok(())
    }

    /// Create, then assign
    ///
    /// When assignment fails the definition stays; retry `assign` alone.
    pub fn create_and_assign(&self, resource: &Resource) -> Result<()> {
        self.create(resource)?;
        self.assign(resource)
    }

    /// Remove the resource from one node
    pub fn unassign(&self, resource: &Resource, node: &str) -> Result<()> {
        info!("Unassigning resource {} from node {}", resource.name, node);
        self.client
            .run(&["delete-resource", &resource.name, node])
            .map_err(|e| e.in_operation("unassign", &resource.name, Some(node)))?;
        Ok(())
    }

    /// Remove the resource definition and with it every placement
    pub fn delete(&self, resource: &Resource) -> Result<()> {
        info!("Deleting resource {}", resource.name);
        self.client
            .run(&["delete-resource-definition", &resource.name])
            .map_err(|e| e.in_operation("delete", &resource.name, None))?;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Fresh snapshot of the resource listing
    pub fn snapshot(&self) -> Result<ResourceSnapshot> {
        self.client.list_resources()
    }

    /// The resource is defined on any node
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.snapshot()?.contains(name))
    }

    /// The resource is placed on this node
    pub fn on_node(&self, name: &str, node: &str) -> Result<bool> {
        Ok(self.snapshot()?.on_node(name, node))
    }

    /// The resource runs diskless on this node
    ///
    /// Query failures read as "not a client".
    pub fn is_client(&self, name: &str, node: &str) -> bool {
        match self.snapshot() {
            Ok(snapshot) => snapshot.is_client(name, node),
            Err(e) => {
                warn!("Cannot tell whether {} is a client on {}: {}", name, node, e);
                false
            }
        }
    }
}
