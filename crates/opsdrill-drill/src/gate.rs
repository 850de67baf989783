//! External verification command gate.
//!
//! The project already owns a "verify" command (a Makefile target, a CI
//! script); its exit code is ground truth for "is the overall system
//! considered healthy". The gate runs it and gates on the exit status;
//! nothing of its logic is reimplemented or parsed here.

use std::process::Stdio;

use tokio::process::Command;

use opsdrill_core::{DrillError, Result};

/// Exit-code gate around the project's verification command.
pub struct VerifyGate {
    command: String,
}

impl VerifyGate {
    /// Creates a gate for the given shell command line.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Returns the command line this gate runs.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Runs the command; zero exit passes the gate.
    pub async fn check(&self) -> Result<()> {
        tracing::info!(command = %self.command, "running verification gate");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .output()
            .await?;

        let code = output.status.code().unwrap_or(-1);
        if code == 0 {
            tracing::debug!(command = %self.command, "verification gate passed");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(command = %self.command, code, stderr = %stderr.trim(), "verification gate failed");
        Err(DrillError::Gate {
            command: self.command.clone(),
            code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gate_passes_on_zero_exit() {
        let gate = VerifyGate::new("true");
        assert!(gate.check().await.is_ok());
    }

    #[tokio::test]
    async fn test_gate_fails_on_nonzero_exit() {
        let gate = VerifyGate::new("exit 7");
        let err = gate.check().await.unwrap_err();
        match &err {
            DrillError::Gate { command, code } => {
                assert_eq!(command, "exit 7");
                assert_eq!(*code, 7);
            }
            other => panic!("expected gate error, got {other}"),
        }
        assert_eq!(err.exit_code(), 8);
    }

    #[tokio::test]
    async fn test_gate_does_not_parse_output() {
        // A command that prints scary things but exits 0 still passes.
        let gate = VerifyGate::new("echo 'ERROR: everything is fine'; true");
        assert!(gate.check().await.is_ok());
    }
}
