//! Status Validation
//!
//! Every mutating linstor command replies with an array of status messages.
//! The process exiting zero is not enough: each message carries a return code
//! whose top bits flag error, warning and info outcomes, and any one of them
//! fails the whole command.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Return Code Masks
// =============================================================================

/// Error severity bit of a return code
pub const MASK_ERROR: u64 = 1 << 63;
/// Warning severity bit of a return code
pub const MASK_WARN: u64 = 1 << 62;
/// Info severity bit of a return code
pub const MASK_INFO: u64 = 1 << 61;

/// True when none of the severity bits are set
pub fn is_success(ret_code: u64) -> bool {
    ret_code & (MASK_ERROR | MASK_WARN | MASK_INFO) == 0
}

// =============================================================================
// Status Messages
// =============================================================================

/// Key/value pair attached to a status message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// One outcome record of a control-plane command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    #[serde(default)]
    pub details_format: String,
    #[serde(default)]
    pub message_format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cause_format: String,
    #[serde(default)]
    pub obj_refs: Vec<KeyValue>,
    #[serde(default)]
    pub variables: Vec<KeyValue>,
    pub ret_code: u64,
}

impl StatusMessage {
    pub fn is_success(&self) -> bool {
        is_success(self.ret_code)
    }
}

/// Full reply of a mutating command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnStatuses(pub Vec<StatusMessage>);

impl ReturnStatuses {
    /// Decode a status array from raw command output
    pub fn decode(command: &str, raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| Error::Decode {
            command: command.to_string(),
            reason: format!("{}: {}", e, String::from_utf8_lossy(raw)),
        })
    }

    /// Fail if any message carries a severity bit
    ///
    /// The error payload is the whole serialized reply, not only the
    /// offending message.
    pub fn validate(&self, command: &str) -> Result<()> {
        if self.0.iter().all(StatusMessage::is_success) {
            return Ok(());
        }

        let statuses = serde_json::to_string(&self.0)?;
        Err(Error::Status {
            command: command.to_string(),
            statuses,
        })
    }

    pub fn messages(&self) -> &[StatusMessage] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_is_success_boundaries() {
        assert!(is_success(0));
        assert!(!is_success(MASK_ERROR));
        assert!(!is_success(MASK_WARN));
        assert!(!is_success(MASK_INFO));
        assert!(!is_success(MASK_ERROR | MASK_WARN | MASK_INFO));
        assert!(!is_success(u64::MAX));

        // Object and operation bits below the severity bits don't matter
        assert!(is_success(0x0000_0000_0400_0001));
        assert!(is_success((1 << 61) - 1));
    }

    #[test]
    fn test_validate_all_clean() {
        let raw = br#"[
            {"details_format": "", "message_format": "New resource definition 'r0' created.",
             "obj_refs": [{"key": "RscDfn", "value": "r0"}], "variables": [], "ret_code": 19464193},
            {"message_format": "r0 UUID is: 1", "ret_code": 0}
        ]"#;
        let statuses = ReturnStatuses::decode("linstor -m create-resource-definition r0", raw).unwrap();
        assert_eq!(statuses.messages().len(), 2);
        assert!(statuses.validate("create-resource-definition").is_ok());
    }

    #[test]
    fn test_validate_reports_whole_reply() {
        let statuses = ReturnStatuses(vec![
            StatusMessage {
                message_format: "ok".into(),
                ret_code: 0,
                ..Default::default()
            },
            StatusMessage {
                message_format: "Resource definition 'r0' already exists".into(),
                cause_format: "duplicate".into(),
                ret_code: MASK_ERROR | 0x0000_0000_0000_0007,
                ..Default::default()
            },
        ]);

        let err = statuses.validate("create-resource-definition r0").unwrap_err();
        assert_matches!(&err, Error::Status { statuses, .. } => {
            assert!(statuses.contains("\"message_format\":\"ok\""));
            assert!(statuses.contains("already exists"));
            assert!(statuses.contains("\"cause_format\":\"duplicate\""));
        });
    }

    #[test]
    fn test_warning_and_info_fail() {
        for ret_code in [MASK_WARN, MASK_INFO] {
            let statuses = ReturnStatuses(vec![StatusMessage {
                ret_code,
                ..Default::default()
            }]);
            assert!(statuses.validate("delete-resource r0 n1").is_err());
        }
    }

    #[test]
    fn test_decode_error_is_distinct() {
        let err = ReturnStatuses::decode("linstor -m delete-resource-definition r0", b"Traceback").unwrap_err();
        assert_matches!(err, Error::Decode { .. });
        assert!(err.is_decode());
    }
}
