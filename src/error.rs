//! Error types for the DRBD volume manager
//!
//! Separates the ways a control-plane or host command can go wrong so callers
//! can pick a retry policy: the process failed, its output could not be
//! decoded, or it decoded fine but reported a logical failure.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the volume manager
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // External Command Errors
    // =========================================================================
    #[error("Command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Couldn't decode output of {command}: {reason}")]
    Decode { command: String, reason: String },

    #[error("Error status from one or more linstor operations ({command}): {statuses}")]
    Status { command: String, statuses: String },

    // =========================================================================
    // Resource Lifecycle Errors
    // =========================================================================
    #[error("No resource definition for resource {resource}")]
    NoResourceDefinition { resource: String },

    #[error("{operation} failed for resource {resource}{}: {source}", node_suffix(.node))]
    Operation {
        operation: &'static str,
        resource: String,
        node: Option<String>,
        #[source]
        source: Box<Error>,
    },

    // =========================================================================
    // Device Errors
    // =========================================================================
    #[error("No state for volume 0 of resource {resource}")]
    VolumeNotFound { resource: String },

    #[error("Couldn't stat {path}: {reason}")]
    DeviceNotFound { path: String, reason: String },

    #[error("Device path for resource {resource} did not appear after {attempts} attempts")]
    DevicePathTimeout { resource: String, attempts: u32 },

    // =========================================================================
    // Filesystem Errors
    // =========================================================================
    #[error("Device {device} already formatted with {found} filesystem, refusing to overwrite with {wanted} filesystem")]
    ForeignFilesystem {
        device: String,
        found: String,
        wanted: String,
    },

    #[error("Filesystem info error: {0}")]
    FilesystemInfo(String),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn node_suffix(node: &Option<String>) -> String {
    match node {
        Some(node) => format!(" on node {}", node),
        None => String::new(),
    }
}

/// What a caller should do after an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Retry with exponential backoff
    RetryWithBackoff,
    /// Retry after a specific duration
    RetryAfter(Duration),
    /// Don't retry, the failure will not clear on its own
    NoRetry,
}

impl Error {
    /// Wrap an error with the operation and resource it came from
    pub fn in_operation(
        self,
        operation: &'static str,
        resource: impl Into<String>,
        node: Option<&str>,
    ) -> Self {
        Error::Operation {
            operation,
            resource: resource.into(),
            node: node.map(str::to_string),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping operation context
    pub fn root(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self.root() {
            // Control plane still converging or a command hiccup
            Error::CommandFailed { .. } | Error::Status { .. } | Error::Io(_) => {
                ErrorAction::RetryWithBackoff
            }

            // Device attachment is a multi-second kernel event
            Error::DeviceNotFound { .. }
            | Error::DevicePathTimeout { .. }
            | Error::VolumeNotFound { .. } => ErrorAction::RetryAfter(Duration::from_secs(2)),

            // Protocol mismatch, wrong state, or data-loss guard
            Error::Decode { .. }
            | Error::JsonParse(_)
            | Error::YamlParse(_)
            | Error::NoResourceDefinition { .. }
            | Error::ForeignFilesystem { .. }
            | Error::FilesystemInfo(_)
            | Error::Configuration(_) => ErrorAction::NoRetry,

            _ => ErrorAction::RetryWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRetry)
    }

    /// Check if the failure came from undecodable output
    pub fn is_decode(&self) -> bool {
        matches!(self.root(), Error::Decode { .. } | Error::JsonParse(_))
    }
}

/// Result type alias for the volume manager
pub type Result<T> = std::result::Result<T, Error>;
