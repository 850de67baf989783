//! Core types for drill runs.
//!
//! A drill is a strictly sequential walk through five phases; every value
//! here is process-lifetime only; nothing is persisted.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DrillError;

/// Unique identifier for a single drill run.
///
/// Stamped on every log line and on the final report so concurrent lab
/// runs against different targets can be told apart after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrillRunId(uuid::Uuid);

impl DrillRunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a run ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for DrillRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DrillRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drill phase.
///
/// Phases form a strict, forward-only state machine:
/// ```text
/// Baseline → OutageInduced → OutageConfirmed → RecoveryInitiated → RecoveryConfirmed
/// ```
/// There are no other transitions. A failure in any phase aborts the run;
/// the drill never skips ahead or retries a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrillPhase {
    /// Service and dependency are untouched; both endpoints must be green.
    Baseline,
    /// The dependency stop command has been delivered.
    OutageInduced,
    /// The service was observed alive-but-unready during the outage.
    OutageConfirmed,
    /// The dependency start command has been delivered.
    RecoveryInitiated,
    /// Readiness returned to green within the deadline, without a restart.
    RecoveryConfirmed,
}

impl DrillPhase {
    /// Returns the phase that follows this one, if any.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Baseline => Some(Self::OutageInduced),
            Self::OutageInduced => Some(Self::OutageConfirmed),
            Self::OutageConfirmed => Some(Self::RecoveryInitiated),
            Self::RecoveryInitiated => Some(Self::RecoveryConfirmed),
            Self::RecoveryConfirmed => None,
        }
    }

    /// Returns true if `to` is the single legal successor of this phase.
    #[must_use]
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    /// Returns true if this is the final phase.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::RecoveryConfirmed)
    }

    /// Returns the phase name as used in logs and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::OutageInduced => "outage-induced",
            Self::OutageConfirmed => "outage-confirmed",
            Self::RecoveryInitiated => "recovery-initiated",
            Self::RecoveryConfirmed => "recovery-confirmed",
        }
    }
}

impl std::fmt::Display for DrillPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named drill target node.
///
/// The lab provisions a fixed set of nodes; anything else is a
/// configuration error, rejected before any command is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeName {
    /// Application node running the primary service.
    App,
    /// Database node hosting the dependency.
    Db,
    /// Edge node (load balancer / ingress).
    Edge,
}

impl NodeName {
    /// All known node names, for error messages.
    pub const ALL: [Self; 3] = [Self::App, Self::Db, Self::Edge];

    /// Returns the node name as used on the command line.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Db => "db",
            Self::Edge => "edge",
        }
    }
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeName {
    type Err = DrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "app" => Ok(Self::App),
            "db" => Ok(Self::Db),
            "edge" => Ok(Self::Edge),
            other => Err(DrillError::config(format!(
                "unknown node '{other}' (known nodes: app, db, edge)"
            ))),
        }
    }
}

/// Expected HTTP status for an endpoint check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Expectation {
    /// Exactly this status code.
    Exactly(u16),
    /// Any status outside the 2xx success range.
    AnyNon2xx,
}

impl Expectation {
    /// Returns true if the observed status satisfies this expectation.
    #[must_use]
    pub const fn matches(&self, observed: u16) -> bool {
        match self {
            Self::Exactly(code) => observed == *code,
            Self::AnyNon2xx => !(observed >= 200 && observed < 300),
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exactly(code) => write!(f, "{code}"),
            Self::AnyNon2xx => f.write_str("any non-2xx"),
        }
    }
}

/// Which readiness statuses count as "honestly unready" during the outage.
///
/// The source drills disagreed on this: some asserted "not 200", others
/// "exactly 503". The contract here is **any non-2xx** by default: the
/// liveness/readiness split cares about *not ready*, not about which
/// failure flavor the service picked. Labs that standardize on 503 can opt
/// into the strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadinessContract {
    /// Any non-2xx readiness status is acceptable while the dependency is down.
    #[default]
    AnyNon2xx,
    /// Only 503 Service Unavailable is acceptable while the dependency is down.
    Exact503,
}

impl ReadinessContract {
    /// Expected readiness status during the outage window.
    #[must_use]
    pub const fn outage_expectation(&self) -> Expectation {
        match self {
            Self::AnyNon2xx => Expectation::AnyNon2xx,
            Self::Exact503 => Expectation::Exactly(503),
        }
    }

    /// Expected readiness status once the dependency is back.
    ///
    /// Recovery is always exactly 200; a 204 or 299 from a readiness
    /// endpoint would be its own kind of dishonesty.
    #[must_use]
    pub const fn recovery_expectation(&self) -> Expectation {
        Expectation::Exactly(200)
    }
}

/// Result of a single HTTP endpoint check.
///
/// Produced by each probe, consumed immediately by the phase assertion,
/// and kept only inside the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// Endpoint path that was probed.
    pub endpoint: String,
    /// What the current phase expected.
    pub expected: Expectation,
    /// Observed status code; `None` means the request itself failed.
    pub observed: Option<u16>,
    /// Round-trip latency in milliseconds.
    pub latency_ms: u64,
    /// Timestamp of the check (Unix epoch ms).
    pub checked_at_epoch_ms: u64,
}

impl ProbeRecord {
    /// Returns true if the observed status satisfies the expectation.
    #[must_use]
    pub fn satisfied(&self) -> bool {
        self.observed.is_some_and(|code| self.expected.matches(code))
    }
}

/// Current Unix epoch time in milliseconds.
#[must_use]
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
