//! Command-line surface.
//!
//! Flags resolve in the usual precedence: built-in defaults, then the
//! optional TOML config file, then `OPSDRILL_*` environment variables,
//! then explicit flags. Resolution happens once, here; the rest of the
//! run never consults the environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use opsdrill_core::{DrillConfig, NodeName, ReadinessContract, Result};

/// Readiness-honesty drill: prove liveness/readiness signaling stays
/// truthful through a dependency outage.
#[derive(Debug, Parser)]
#[command(name = "opsdrill", version, about)]
pub struct Cli {
    /// Log level when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info", env = "OPSDRILL_LOG")]
    pub log_level: String,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full outage/recovery drill against a target node.
    Run(RunOptions),
    /// One-shot reachability and endpoint snapshot, no injection.
    Probe(TargetOptions),
    /// Verify the build-info endpoint contract.
    VersionCheck(VersionCheckOptions),
}

/// How to print the drill report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable step list ending in PASS/FAIL.
    Text,
    /// The full report as JSON.
    Json,
}

/// Target selection shared by all subcommands.
#[derive(Debug, Args)]
pub struct TargetOptions {
    /// Target node running the primary service.
    #[arg(long, value_parser = parse_node, default_value = "app", env = "OPSDRILL_NODE")]
    pub node: NodeName,

    /// Hostname or address the probes connect to.
    #[arg(long, env = "OPSDRILL_HOST")]
    pub host: Option<String>,

    /// Service port.
    #[arg(long, env = "OPSDRILL_PORT")]
    pub port: Option<u16>,

    /// TOML config file to start from.
    #[arg(long, value_name = "FILE", env = "OPSDRILL_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Options for `opsdrill run`.
#[derive(Debug, Args)]
pub struct RunOptions {
    /// Target selection.
    #[command(flatten)]
    pub target: TargetOptions,

    /// Node hosting the dependency to stop/start.
    #[arg(long, value_parser = parse_node, env = "OPSDRILL_DB_NODE")]
    pub db_node: Option<NodeName>,

    /// Dependency service name substituted into the stop/start templates.
    #[arg(long, env = "OPSDRILL_DB_SERVICE")]
    pub service: Option<String>,

    /// Primary process name for the restart guard.
    #[arg(long, env = "OPSDRILL_PROCESS")]
    pub process_name: Option<String>,

    /// Disable the restart guard entirely.
    #[arg(long, conflicts_with = "process_name")]
    pub no_restart_guard: bool,

    /// External verification command gated on exit code.
    #[arg(long, value_name = "CMD", env = "OPSDRILL_VERIFY_CMD")]
    pub verify_cmd: Option<String>,

    /// Also run the verification gate before inducing the outage.
    #[arg(long)]
    pub preflight: bool,

    /// Require exactly 503 (instead of any non-2xx) from readiness
    /// during the outage.
    #[arg(long)]
    pub strict_503: bool,

    /// Interval between readiness polls during recovery.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION", env = "OPSDRILL_POLL_INTERVAL")]
    pub poll_interval: Option<Duration>,

    /// Deadline for readiness to return after the dependency is restored.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION", env = "OPSDRILL_RECOVERY_DEADLINE")]
    pub recovery_deadline: Option<Duration>,

    /// SSH destination (`user@host`) for the dependency node; local
    /// execution when omitted.
    #[arg(long, value_name = "DEST", env = "OPSDRILL_SSH_DB")]
    pub ssh_db: Option<String>,

    /// SSH destination (`user@host`) for the target node; local
    /// execution when omitted.
    #[arg(long, value_name = "DEST", env = "OPSDRILL_SSH_APP")]
    pub ssh_app: Option<String>,

    /// Report output format.
    #[arg(long, value_enum, default_value = "text")]
    pub report: ReportFormat,
}

/// Options for `opsdrill version-check`.
#[derive(Debug, Args)]
pub struct VersionCheckOptions {
    /// Target selection.
    #[command(flatten)]
    pub target: TargetOptions,

    /// Fail unless the reported service name matches.
    #[arg(long, value_name = "NAME", env = "OPSDRILL_EXPECT_SERVICE")]
    pub expect_service: Option<String>,
}

fn parse_node(s: &str) -> std::result::Result<NodeName, String> {
    s.parse().map_err(|e: opsdrill_core::DrillError| e.to_string())
}

impl TargetOptions {
    /// Loads the base config (file or defaults) and applies the shared
    /// target overrides.
    pub fn resolve(&self) -> Result<DrillConfig> {
        let mut config = match &self.config {
            Some(path) => DrillConfig::load(path)?,
            None => DrillConfig::default(),
        };
        config.target.node = self.node;
        if let Some(host) = &self.host {
            config.target.host = host.clone();
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        Ok(config)
    }
}

impl RunOptions {
    /// Resolves the full drill configuration from file, env, and flags.
    pub fn resolve(&self) -> Result<DrillConfig> {
        let mut config = self.target.resolve()?;

        if let Some(node) = self.db_node {
            config.dependency.node = node;
        }
        if let Some(service) = &self.service {
            config.dependency.service = service.clone();
        }
        if self.no_restart_guard {
            config.target.process_name = None;
        } else if let Some(name) = &self.process_name {
            config.target.process_name = Some(name.clone());
        }
        if let Some(command) = &self.verify_cmd {
            config.verify.command = Some(command.clone());
        }
        if self.preflight {
            config.verify.preflight = true;
        }
        if self.strict_503 {
            config.readiness_contract = ReadinessContract::Exact503;
        }
        if let Some(interval) = self.poll_interval {
            config.timing.poll_interval = interval;
        }
        if let Some(deadline) = self.recovery_deadline {
            config.timing.recovery_deadline = deadline;
        }

        config.validate()?;
        Ok(config)
    }
}
