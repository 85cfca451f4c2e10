//! DRBD Volume Manager
//!
//! Command-line frontend for LINSTOR resource lifecycle, device discovery
//! and mounting. Library calls block, so each runs on the blocking pool
//! where it can be bounded by `--timeout-secs` and interrupted by Ctrl-C.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use drbd_volume_manager::{Config, Error, Resource, Result, VolumeManager};

/// Exit status for failures worth retrying (EX_TEMPFAIL)
const EXIT_RETRYABLE: u8 = 75;

// =============================================================================
// CLI Arguments
// =============================================================================

/// DRBD Volume Manager - LINSTOR resource lifecycle and mounting
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "DVM_CONFIG")]
    config: Option<PathBuf>,

    /// LINSTOR client binary
    #[arg(long, env = "LINSTOR_BIN")]
    linstor_bin: Option<String>,

    /// LINSTOR controllers (host[:port],...)
    #[arg(long, env = "LS_CONTROLLERS")]
    controllers: Option<String>,

    /// Abort the operation after this many seconds
    #[arg(long, env = "DVM_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct Placement {
    /// Resource name
    name: String,

    /// Node to hold a disk-backed replica (repeatable)
    #[arg(long = "node")]
    nodes: Vec<String>,

    /// Node to attach as a diskless client (repeatable)
    #[arg(long = "client")]
    clients: Vec<String>,

    /// Storage pool for disk-backed replicas
    #[arg(long, short = 's', default_value = "")]
    storage_pool: String,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Reserve a resource definition and its volume
    Create {
        name: String,
        /// Volume size in KiB
        #[arg(long)]
        size_kib: u64,
    },
    /// Place a defined resource on nodes
    Assign(Placement),
    /// Create, then assign
    Deploy {
        #[command(flatten)]
        placement: Placement,
        /// Volume size in KiB
        #[arg(long)]
        size_kib: u64,
    },
    /// Remove a resource from one node
    Unassign { name: String, node: String },
    /// Remove a resource definition and all placements
    Delete { name: String },
    /// Check whether a resource is defined
    Exists { name: String },
    /// Check whether a resource is placed on a node
    OnNode { name: String, node: String },
    /// Check whether a resource is diskless on a node
    IsClient { name: String, node: String },
    /// Wait for the resource's local device path
    DevPath {
        name: String,
        #[arg(long, default_value = "3")]
        retries: u32,
    },
    /// Format (if blank) and mount a resource's device
    Mount {
        name: String,
        path: String,
        /// Filesystem type, defaults to the configured one
        #[arg(long)]
        fs_type: Option<String>,
    },
    /// Unmount a path if it is mounted
    Unmount { path: String },
    /// Print the resource listing as JSON
    List,
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Cli::parse();

    init_logging(&args);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Cannot start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = load_config(&args).and_then(|config| {
        let volumes = Arc::new(VolumeManager::system(config));
        runtime.block_on(run(
            volumes,
            args.command.clone(),
            args.timeout_secs.map(Duration::from_secs),
        ))
    });

    // After a timeout or interrupt the worker may still be blocked on a child
    // process; dropping the runtime would wait for it.
    runtime.shutdown_background();

    match result {
        Ok(output) => {
            if let Some(output) = output {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            if e.is_retryable() {
                ExitCode::from(EXIT_RETRYABLE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

/// Run one command on the blocking pool, bounded by `timeout` and Ctrl-C
///
/// Returns as soon as the limit or the interrupt wins; the worker is left
/// behind for the caller to abandon.
async fn run(
    volumes: Arc<VolumeManager>,
    command: Command,
    timeout: Option<Duration>,
) -> Result<Option<String>> {
    info!("drbd-volume-manager {}: {:?}", drbd_volume_manager::VERSION, command);

    let task = tokio::task::spawn_blocking(move || execute(&volumes, command));

    let joined = match timeout {
        Some(limit) => {
            tokio::select! {
                res = tokio::time::timeout(limit, task) => res.map_err(|_| {
                    Error::Internal(format!("Operation timed out after {:?}", limit))
                })?,
                _ = tokio::signal::ctrl_c() => {
                    return Err(Error::Internal("Interrupted".into()));
                }
            }
        }
        None => {
            tokio::select! {
                res = task => res,
                _ = tokio::signal::ctrl_c() => {
                    return Err(Error::Internal("Interrupted".into()));
                }
            }
        }
    };

    joined.map_err(|e| Error::Internal(format!("Worker failed: {}", e)))?
}

fn load_config(args: &Cli) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(bin) = &args.linstor_bin {
        config.control_plane.binary = bin.clone();
    }
    if let Some(controllers) = &args.controllers {
        config.control_plane.controllers = Some(controllers.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Run one command, returning what to print on stdout
fn execute(volumes: &VolumeManager, command: Command) -> Result<Option<String>> {
    let resources = volumes.resources();

    match command {
        Command::Create { name, size_kib } => {
            resources.create(&Resource {
                size_kib,
                ..Resource::new(name)
            })?;
            Ok(None)
        }
        Command::Assign(placement) => {
            resources.assign(&placement.into_resource(0))?;
            Ok(None)
        }
        Command::Deploy {
            placement,
            size_kib,
        } => {
            resources.create_and_assign(&placement.into_resource(size_kib))?;
            Ok(None)
        }
        Command::Unassign { name, node } => {
            resources.unassign(&Resource::new(name), &node)?;
            Ok(None)
        }
        Command::Delete { name } => {
            resources.delete(&Resource::new(name))?;
            Ok(None)
        }
        Command::Exists { name } => Ok(Some(resources.exists(&name)?.to_string())),
        Command::OnNode { name, node } => Ok(Some(resources.on_node(&name, &node)?.to_string())),
        Command::IsClient { name, node } => Ok(Some(resources.is_client(&name, &node).to_string())),
        Command::DevPath { name, retries } => {
            Ok(Some(volumes.resolver().wait_for_dev_path(&name, retries)?))
        }
        Command::Mount {
            name,
            path,
            fs_type,
        } => {
            let fs_type = fs_type.unwrap_or_else(|| volumes.config().filesystem.fs_type.clone());
            volumes.filesystems().mount(&name, &fs_type, &path)?;
            Ok(None)
        }
        Command::Unmount { path } => {
            volumes.filesystems().unmount(&path)?;
            Ok(None)
        }
        Command::List => {
            let snapshot = resources.snapshot()?;
            Ok(Some(serde_json::to_string_pretty(&snapshot)?))
        }
    }
}

impl Placement {
    fn into_resource(self, size_kib: u64) -> Resource {
        Resource {
            name: self.name,
            node_list: self.nodes,
            client_list: self.clients,
            storage_pool: self.storage_pool,
            size_kib,
            ..Default::default()
        }
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Cli) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries command results
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drbd_volume_manager::{CommandExecutor, CommandOutput, LocalDevices};
    use std::io;
    use std::time::Instant;

    /// Executor whose every command takes `delay` before printing `output`
    struct SlowExecutor {
        delay: Duration,
        output: &'static str,
    }

    impl CommandExecutor for SlowExecutor {
        fn execute(&self, _program: &str, _args: &[String]) -> io::Result<CommandOutput> {
            std::thread::sleep(self.delay);
            Ok(CommandOutput::ok(self.output))
        }
    }

    fn volumes(delay: Duration, output: &'static str) -> Arc<VolumeManager> {
        Arc::new(VolumeManager::new(
            Config::default(),
            Arc::new(SlowExecutor { delay, output }),
            Arc::new(LocalDevices),
        ))
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_timeout_abandons_blocked_worker() {
        let rt = runtime();
        let start = Instant::now();

        let result = rt.block_on(run(
            volumes(Duration::from_secs(5), "[]"),
            Command::Exists { name: "r0".into() },
            Some(Duration::from_millis(100)),
        ));
        rt.shutdown_background();

        match result {
            Err(Error::Internal(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_completes_within_timeout() {
        let rt = runtime();

        let result = rt.block_on(run(
            volumes(Duration::ZERO, r#"[{"resources": [{"name": "r0", "node_name": "node-a"}]}]"#),
            Command::Exists { name: "r0".into() },
            Some(Duration::from_secs(5)),
        ));
        rt.shutdown_background();

        assert_eq!(result.unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_worker_error_is_returned() {
        let rt = runtime();

        let result = rt.block_on(run(volumes(Duration::ZERO, "not json"), Command::List, None));
        rt.shutdown_background();

        assert!(result.unwrap_err().is_decode());
    }
}
