//! Process identity capture and the restart guard.
//!
//! Recovery must happen by reconnecting, not by restarting: a supervisor
//! quietly bouncing the service would also make readiness green again and
//! mask a broken reconnect path. The guard captures the primary process's
//! pid and kernel start time before the drill and verifies both are
//! unchanged after recovery. The start time comes from field 22 of
//! `/proc/<pid>/stat` (clock ticks since boot), which a pid reuse cannot
//! plausibly reproduce.

use std::sync::Arc;

use opsdrill_core::{DrillError, Result};

use crate::channel::CommandChannel;

/// Identity of the primary service process at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    /// Process id.
    pub pid: u32,
    /// Kernel start time in clock ticks since boot (`/proc` stat field 22).
    pub start_ticks: u64,
}

impl std::fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pid {} started at tick {}", self.pid, self.start_ticks)
    }
}

/// Extracts the start-time field from a `/proc/<pid>/stat` line.
///
/// The comm field may itself contain spaces and parentheses, so fields
/// are counted from the last `)`. After pid and comm, `starttime` is the
/// 20th remaining field.
#[must_use]
pub fn parse_stat_starttime(stat_line: &str) -> Option<u64> {
    let comm_end = stat_line.rfind(')')?;
    let after_comm = stat_line.get(comm_end + 2..)?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    fields.get(19)?.parse().ok()
}

/// Captures and re-verifies the primary process identity over a channel.
pub struct IdentityGuard {
    channel: Arc<dyn CommandChannel>,
    process_name: String,
}

impl IdentityGuard {
    /// Creates a guard for the named process.
    #[must_use]
    pub fn new(channel: Arc<dyn CommandChannel>, process_name: impl Into<String>) -> Self {
        Self {
            channel,
            process_name: process_name.into(),
        }
    }

    /// Captures the current identity of the primary process.
    pub async fn capture(&self) -> Result<ProcessIdentity> {
        let pid = self.resolve_pid().await?;
        let start_ticks = self.read_start_ticks(pid).await?;
        let identity = ProcessIdentity { pid, start_ticks };
        tracing::debug!(process = %self.process_name, %identity, "captured process identity");
        Ok(identity)
    }

    /// Verifies the process still has the identity captured at baseline.
    pub async fn verify_unchanged(&self, baseline: &ProcessIdentity) -> Result<()> {
        let current = self.capture().await?;
        if current == *baseline {
            tracing::info!(process = %self.process_name, "process identity unchanged across drill");
            return Ok(());
        }
        Err(DrillError::Identity {
            before: baseline.to_string(),
            after: current.to_string(),
        })
    }

    async fn resolve_pid(&self) -> Result<u32> {
        let command = format!("pidof -s {}", self.process_name);
        let output = self.channel.run(&command).await?;
        if !output.success() {
            return Err(DrillError::channel(format!(
                "process '{}' not found on {}",
                self.process_name,
                self.channel.describe()
            )));
        }
        output.stdout.trim().parse().map_err(|_| {
            DrillError::channel(format!(
                "unparseable pidof output '{}' from {}",
                output.stdout.trim(),
                self.channel.describe()
            ))
        })
    }

    async fn read_start_ticks(&self, pid: u32) -> Result<u64> {
        let command = format!("cat /proc/{pid}/stat");
        let output = self.channel.run(&command).await?;
        if !output.success() {
            return Err(DrillError::channel(format!(
                "cannot read /proc/{pid}/stat on {}",
                self.channel.describe()
            )));
        }
        parse_stat_starttime(&output.stdout).ok_or_else(|| {
            DrillError::channel(format!("malformed /proc/{pid}/stat on {}", self.channel.describe()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChannel;
    use opsdrill_core::NodeName;

    const STAT_LINE: &str = "1234 (mock-exchange) S 1 1234 1234 0 -1 4194304 2859 0 0 0 12 7 0 0 20 0 4 0 8899001 22335488 2048 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0";

    #[test]
    fn test_parse_starttime_from_stat() {
        assert_eq!(parse_stat_starttime(STAT_LINE), Some(8_899_001));
    }

    #[test]
    fn test_parse_starttime_with_spaces_in_comm() {
        let line = "77 (tmux: server) S 1 77 77 0 -1 4194304 1 0 0 0 0 0 0 0 20 0 1 0 424242 0 0 0";
        assert_eq!(parse_stat_starttime(line), Some(424_242));
    }

    #[test]
    fn test_parse_starttime_rejects_garbage() {
        assert_eq!(parse_stat_starttime("not a stat line"), None);
        assert_eq!(parse_stat_starttime("1 (x) S 2 3"), None);
    }

    fn guard_with(channel: &Arc<ScriptedChannel>) -> IdentityGuard {
        IdentityGuard::new(
            Arc::clone(channel) as Arc<dyn CommandChannel>,
            "mock-exchange",
        )
    }

    #[tokio::test]
    async fn test_capture_reads_pid_and_start_ticks() {
        let channel = Arc::new(ScriptedChannel::new(NodeName::App));
        channel.respond_ok("1234\n");
        channel.respond_ok(STAT_LINE);

        let identity = guard_with(&channel).capture().await.expect("identity");
        assert_eq!(identity.pid, 1234);
        assert_eq!(identity.start_ticks, 8_899_001);

        let delivered = channel.delivered();
        assert_eq!(delivered[0], "pidof -s mock-exchange");
        assert_eq!(delivered[1], "cat /proc/1234/stat");
    }

    #[tokio::test]
    async fn test_verify_unchanged_passes_for_same_identity() {
        let channel = Arc::new(ScriptedChannel::new(NodeName::App));
        channel.respond_ok("1234\n");
        channel.respond_ok(STAT_LINE);
        let guard = guard_with(&channel);
        let baseline = ProcessIdentity {
            pid: 1234,
            start_ticks: 8_899_001,
        };

        assert!(guard.verify_unchanged(&baseline).await.is_ok());
    }

    #[tokio::test]
    async fn test_restart_is_detected() {
        // Same pid, different start tick: the pid was reused by a new
        // process. Still a restart.
        let channel = Arc::new(ScriptedChannel::new(NodeName::App));
        channel.respond_ok("1234\n");
        channel.respond_ok(
            "1234 (mock-exchange) S 1 1234 1234 0 -1 4194304 1 0 0 0 0 0 0 0 20 0 4 0 9000000 0 0 0",
        );
        let guard = guard_with(&channel);
        let baseline = ProcessIdentity {
            pid: 1234,
            start_ticks: 8_899_001,
        };

        let err = guard.verify_unchanged(&baseline).await.unwrap_err();
        match &err {
            DrillError::Identity { before, after } => {
                assert!(before.contains("8899001"));
                assert!(after.contains("9000000"));
            }
            other => panic!("expected identity error, got {other}"),
        }
        assert_eq!(err.exit_code(), 7);
    }

    #[tokio::test]
    async fn test_missing_process_is_channel_error() {
        let channel = Arc::new(ScriptedChannel::new(NodeName::App));
        channel.respond_err(1, "");
        let guard = guard_with(&channel);

        let err = guard.capture().await.unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }
}
