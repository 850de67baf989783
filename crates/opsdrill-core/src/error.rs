//! Error taxonomy for drill runs.
//!
//! Every class here is fatal: the drill surfaces truth and never retries
//! or remediates. The only retry loop in the tool lives inside the bounded
//! recovery poll, and its exhaustion is itself an error (`RecoveryTimeout`).

use std::time::Duration;

use crate::types::{DrillPhase, Expectation};

/// Result type alias for drill operations.
pub type Result<T> = std::result::Result<T, DrillError>;

/// Comprehensive error type for drill operations.
#[derive(Debug, thiserror::Error)]
pub enum DrillError {
    /// Configuration error (unknown node, bad durations, missing fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Target host/port unreachable at the transport layer.
    ///
    /// Fatal during baseline and recovery. During the outage phase the
    /// *absence* of this error is what proves the process stayed alive.
    #[error("transport failure: {host}:{port} unreachable ({reason})")]
    Transport {
        /// Target host.
        host: String,
        /// Target port.
        port: u16,
        /// What the last probe mechanism reported.
        reason: String,
    },

    /// The service lied about its state.
    ///
    /// This is the property the tool exists to catch: a readiness 200
    /// while the dependency is down, or a liveness failure while the
    /// process runs. Never tolerated, never retried.
    #[error(
        "protocol violation in {phase} phase: {endpoint} returned {observed}, expected {expected}"
    )]
    ProtocolViolation {
        /// Phase in which the violation was observed.
        phase: DrillPhase,
        /// Offending endpoint path.
        endpoint: String,
        /// What the phase contract expected.
        expected: Expectation,
        /// Status code actually observed.
        observed: u16,
    },

    /// Readiness did not return within the recovery deadline.
    #[error(
        "recovery timed out after {elapsed:?} (deadline {deadline:?}, last observed status {last_observed:?})"
    )]
    RecoveryTimeout {
        /// Configured deadline.
        deadline: Duration,
        /// Time actually spent polling.
        elapsed: Duration,
        /// Last readiness status seen before giving up.
        last_observed: Option<u16>,
    },

    /// Stop/start command could not be delivered to the dependency node.
    ///
    /// The drill's premise is controlled fault injection; if injection
    /// itself fails there is nothing meaningful left to verify.
    #[error("outage injection failed: {0}")]
    Injection(String),

    /// The remote command channel itself failed (spawn error, unreachable
    /// node, garbled remote output).
    #[error("command channel failure: {0}")]
    Channel(String),

    /// The primary process changed identity mid-drill.
    ///
    /// Recovery must happen by reconnecting, not by restarting.
    #[error("process identity changed during drill: was {before}, now {after}")]
    Identity {
        /// Identity captured at baseline.
        before: String,
        /// Identity captured after recovery.
        after: String,
    },

    /// External verification command exited non-zero.
    #[error("verification gate '{command}' failed with exit code {code}")]
    Gate {
        /// Command line that was run.
        command: String,
        /// Its exit code.
        code: i32,
    },

    /// HTTP request failure outside the transport probe.
    #[error("http error: {0}")]
    Http(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DrillError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Transport {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Creates an injection error.
    #[must_use]
    pub fn injection(msg: impl Into<String>) -> Self {
        Self::Injection(msg.into())
    }

    /// Creates a command channel error.
    #[must_use]
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Creates an HTTP error.
    #[must_use]
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Creates the dishonest-readiness violation: readiness reported 200
    /// while the dependency was down.
    #[must_use]
    pub fn dishonest_readiness(endpoint: impl Into<String>, expected: Expectation) -> Self {
        Self::ProtocolViolation {
            phase: DrillPhase::OutageConfirmed,
            endpoint: endpoint.into(),
            expected,
            observed: 200,
        }
    }

    /// Returns true if this is the dishonest-readiness violation.
    #[must_use]
    pub const fn is_dishonest_readiness(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation {
                phase: DrillPhase::OutageConfirmed,
                observed: 200,
                ..
            }
        )
    }

    /// Process exit code for this error class.
    ///
    /// The Makefile and CI only see the exit status, so each class gets a
    /// stable, distinct code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::ProtocolViolation { .. } => 3,
            Self::RecoveryTimeout { .. } => 4,
            Self::Transport { .. } => 5,
            Self::Injection(_) => 6,
            Self::Identity { .. } => 7,
            Self::Gate { .. } => 8,
            Self::Channel(_) => 9,
            Self::Http(_) | Self::Io(_) => 1,
        }
    }
}
