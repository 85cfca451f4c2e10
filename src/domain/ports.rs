//! Domain Ports - Boundaries to the host system
//!
//! Everything this crate knows about the outside world goes through these
//! traits: running an external command and checking whether a path exists.
//! The control-plane client, the device path resolver and the filesystem
//! manager are all written against them, so they can be driven by canned
//! output in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;
use std::process::Command;
use tracing::trace;

// =============================================================================
// Command Execution
// =============================================================================

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Process exited with status zero
    pub success: bool,
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// stdout followed by stderr
    pub output: Vec<u8>,
}

impl CommandOutput {
    /// Successful exit with the given output
    pub fn ok(output: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: output.into(),
        }
    }

    /// Failed exit with the given code and output
    pub fn failed(code: i32, output: impl Into<Vec<u8>>) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: output.into(),
        }
    }

    /// Output as text, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs external commands and captures their combined output
///
/// Implementations block until the child exits.
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args`. An `Err` means the process could not be
    /// launched at all; a non-zero exit is reported through
    /// [`CommandOutput::success`].
    fn execute(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// Executor backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        trace!("exec: {}", CommandLine(program, args));

        let output = Command::new(program).args(args).output()?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            output: combined,
        })
    }
}

/// Display adapter rendering a program and its arguments as one line
pub struct CommandLine<'a>(pub &'a str, pub &'a [String]);

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        for arg in self.1 {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

// =============================================================================
// Device Namespace
// =============================================================================

/// Stat-like check for paths in the local device namespace
pub trait DeviceLookup: Send + Sync {
    /// `Ok` if something exists at `path` (symlinks are not followed)
    fn stat(&self, path: &Path) -> io::Result<()>;
}

/// Lookup backed by `lstat` on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDevices;

impl DeviceLookup for LocalDevices {
    fn stat(&self, path: &Path) -> io::Result<()> {
        std::fs::symlink_metadata(path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_display() {
        let args = vec!["-m".to_string(), "ls-rsc".to_string()];
        assert_eq!(CommandLine("linstor", &args).to_string(), "linstor -m ls-rsc");
        assert_eq!(CommandLine("sync", &[]).to_string(), "sync");
    }

    #[test]
    fn test_local_devices_stat() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("drbd7");
        std::fs::write(&present, b"").unwrap();

        assert!(LocalDevices.stat(&present).is_ok());
        assert!(LocalDevices.stat(&dir.path().join("drbd8")).is_err());
    }

    #[test]
    fn test_command_output_text() {
        let out = CommandOutput::failed(1, "no such resource\n");
        assert!(!out.success);
        assert_eq!(out.text(), "no such resource\n");
    }
}
