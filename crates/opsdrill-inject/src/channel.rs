//! Remote command channel abstraction.
//!
//! The drill needs exactly one remote capability: run a command on a
//! named node and observe its exit code and output. SSH is the normal
//! transport; a local channel covers single-host labs and tests. Failure
//! to deliver a command at all is fatal: the drill's premise is
//! controlled fault injection, so a dead channel ends the run.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use opsdrill_core::{DrillError, NodeName, Result};

/// Output of a delivered command.
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ChannelOutput {
    /// Returns true if the command exited 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.code == 0
    }
}

/// Command execution against a named node.
///
/// `run` resolves to `Ok` whenever the command was delivered and ran,
/// even if it exited non-zero; the caller owns the exit-code policy.
/// `Err` means the channel itself failed.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Node this channel talks to.
    fn node(&self) -> NodeName;

    /// Human-readable channel description for logs.
    fn describe(&self) -> String;

    /// Delivers a shell command and waits for it to finish.
    async fn run(&self, command: &str) -> Result<ChannelOutput>;
}

fn to_output(output: std::process::Output) -> ChannelOutput {
    ChannelOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// SSH-based channel to a remote node.
///
/// Uses `BatchMode` so a missing key fails fast instead of prompting; a
/// drill run is non-interactive by definition.
pub struct SshChannel {
    node: NodeName,
    destination: String,
    connect_timeout: Duration,
}

impl SshChannel {
    /// Creates a channel to `destination` (`user@host` or an ssh alias).
    #[must_use]
    pub fn new(node: NodeName, destination: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            node,
            destination: destination.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl CommandChannel for SshChannel {
    fn node(&self) -> NodeName {
        self.node
    }

    fn describe(&self) -> String {
        format!("ssh {} ({})", self.destination, self.node)
    }

    async fn run(&self, command: &str) -> Result<ChannelOutput> {
        let connect_secs = self.connect_timeout.as_secs().max(1);
        let output = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={connect_secs}"))
            .arg(&self.destination)
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DrillError::channel(format!("{}: {e}", self.describe())))?;

        let output = to_output(output);
        // ssh reserves 255 for its own failures (auth, DNS, refused);
        // anything else is the remote command's code.
        if output.code == 255 {
            return Err(DrillError::channel(format!(
                "{}: ssh transport failed: {}",
                self.describe(),
                output.stderr.trim()
            )));
        }
        tracing::debug!(node = %self.node, command, code = output.code, "remote command finished");
        Ok(output)
    }
}

/// Local channel for single-host labs and tests.
pub struct LocalChannel {
    node: NodeName,
}

impl LocalChannel {
    /// Creates a local channel standing in for `node`.
    #[must_use]
    pub const fn new(node: NodeName) -> Self {
        Self { node }
    }
}

#[async_trait]
impl CommandChannel for LocalChannel {
    fn node(&self) -> NodeName {
        self.node
    }

    fn describe(&self) -> String {
        format!("local ({})", self.node)
    }

    async fn run(&self, command: &str) -> Result<ChannelOutput> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DrillError::channel(format!("{}: {e}", self.describe())))?;

        let output = to_output(output);
        tracing::debug!(node = %self.node, command, code = output.code, "local command finished");
        Ok(output)
    }
}
