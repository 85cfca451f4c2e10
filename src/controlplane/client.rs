//! LINSTOR Command Client
//!
//! The control plane is only reachable through its command-line client run in
//! machine-readable mode. This module owns argument construction and the
//! three-way failure split: the process failed, the output didn't decode, or
//! the decoded reply carries a severity bit.

use crate::config::ControlPlaneConfig;
use crate::controlplane::snapshot::ResourceSnapshot;
use crate::controlplane::status::ReturnStatuses;
use crate::domain::ports::{CommandExecutor, CommandLine, CommandOutput};
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Machine-readable output flag
const MACHINE_READABLE: &str = "-m";

/// Resource listing subcommand
const LIST_RESOURCES: &str = "ls-rsc";

/// Client issuing commands to the LINSTOR control plane
#[derive(Clone)]
pub struct LinstorClient {
    executor: Arc<dyn CommandExecutor>,
    config: ControlPlaneConfig,
}

impl LinstorClient {
    /// Create a new client
    pub fn new(executor: Arc<dyn CommandExecutor>, config: ControlPlaneConfig) -> Self {
        Self { executor, config }
    }

    /// Full argument list for a subcommand
    fn args(&self, subcommand: &[&str]) -> Vec<String> {
        let mut args = vec![MACHINE_READABLE.to_string()];
        if let Some(controllers) = &self.config.controllers {
            args.push("--controllers".to_string());
            args.push(controllers.clone());
        }
        args.extend(subcommand.iter().map(|s| s.to_string()));
        args
    }

    /// Run a subcommand, failing on launch errors and non-zero exits
    fn invoke(&self, subcommand: &[&str]) -> Result<(String, CommandOutput)> {
        let args = self.args(subcommand);
        let command = CommandLine(&self.config.binary, &args).to_string();
        debug!("linstor: {}", command);

        let output = self
            .executor
            .execute(&self.config.binary, &args)
            .map_err(|e| Error::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.success {
            return Err(Error::CommandFailed {
                reason: format!(
                    "exit status {} : {}",
                    output
                        .code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".into()),
                    output.text().trim()
                ),
                command,
            });
        }

        Ok((command, output))
    }

    /// Run a mutating subcommand and validate its status reply
    pub fn run(&self, subcommand: &[&str]) -> Result<ReturnStatuses> {
        let (command, output) = self.invoke(subcommand)?;
        let statuses = ReturnStatuses::decode(&command, &output.output)?;
        statuses.validate(&command)?;
        Ok(statuses)
    }

    /// Fetch a fresh resource listing
    pub fn list_resources(&self) -> Result<ResourceSnapshot> {
        let (command, output) = self.invoke(&[LIST_RESOURCES])?;
        ResourceSnapshot::decode(&command, &output.output)
    }
}
