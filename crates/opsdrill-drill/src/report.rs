//! Drill run reporting.
//!
//! Every step the runner executes lands here as a named outcome; the
//! rendered report ends with a single `PASS` or `FAIL` line, which is the
//! only thing a calling Makefile is expected to read (besides the exit
//! code).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use opsdrill_core::{DrillError, DrillPhase, DrillRunId, epoch_ms};

/// The steps of the verification sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrillStep {
    /// Capture the primary process identity.
    CaptureIdentity,
    /// Baseline liveness/readiness assertion.
    BaselineEndpoints,
    /// Baseline build-info verification.
    BaselineVersion,
    /// Optional pre-flight verification gate.
    PreflightGate,
    /// Deliver the dependency stop command.
    InduceOutage,
    /// TCP reachability probe during the outage.
    TransportProbe,
    /// Outage-phase liveness/readiness assertion.
    OutageEndpoints,
    /// Verification gate during the outage.
    OutageGate,
    /// Deliver the dependency start command.
    RestoreDependency,
    /// Bounded readiness recovery poll.
    RecoveryPoll,
    /// Recovered liveness/readiness assertion.
    RecoveredEndpoints,
    /// Verify the primary process was never restarted.
    IdentityCheck,
    /// Final verification gate.
    FinalGate,
}

impl DrillStep {
    /// Step name as used in logs and the report.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CaptureIdentity => "capture-identity",
            Self::BaselineEndpoints => "baseline-endpoints",
            Self::BaselineVersion => "baseline-version",
            Self::PreflightGate => "preflight-gate",
            Self::InduceOutage => "induce-outage",
            Self::TransportProbe => "transport-probe",
            Self::OutageEndpoints => "outage-endpoints",
            Self::OutageGate => "outage-gate",
            Self::RestoreDependency => "restore-dependency",
            Self::RecoveryPoll => "recovery-poll",
            Self::RecoveredEndpoints => "recovered-endpoints",
            Self::IdentityCheck => "identity-check",
            Self::FinalGate => "final-gate",
        }
    }
}

impl std::fmt::Display for DrillStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Which step ran.
    pub step: DrillStep,
    /// Phase the drill was in.
    pub phase: DrillPhase,
    /// Whether the step passed.
    pub passed: bool,
    /// Human-readable detail (evidence on pass, error on fail).
    pub detail: String,
    /// Step duration in milliseconds.
    pub elapsed_ms: u64,
}

/// Final verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// All steps passed.
    Pass,
    /// A step failed; everything after it was skipped.
    Fail,
    /// The run is still in progress.
    InProgress,
}

/// Full record of a drill run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillReport {
    /// Run identifier.
    pub run_id: DrillRunId,
    /// Target address the drill probed.
    pub target: String,
    /// Run start (Unix epoch ms).
    pub started_at_epoch_ms: u64,
    /// Executed steps in order. Steps after a failure are absent, not
    /// marked skipped; the run short-circuits.
    pub steps: Vec<StepOutcome>,
    /// Final verdict.
    pub verdict: Verdict,
    /// The failing error, if any.
    pub failure: Option<String>,
    /// Total run duration in milliseconds.
    pub total_elapsed_ms: u64,
}

impl DrillReport {
    /// Starts an empty report for a run.
    #[must_use]
    pub fn new(run_id: DrillRunId, target: impl Into<String>) -> Self {
        Self {
            run_id,
            target: target.into(),
            started_at_epoch_ms: epoch_ms(),
            steps: Vec::new(),
            verdict: Verdict::InProgress,
            failure: None,
            total_elapsed_ms: 0,
        }
    }

    /// Records a passed step.
    pub fn record_pass(
        &mut self,
        step: DrillStep,
        phase: DrillPhase,
        detail: impl Into<String>,
        elapsed: Duration,
    ) {
        self.steps.push(StepOutcome {
            step,
            phase,
            passed: true,
            detail: detail.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    /// Records a failed step.
    pub fn record_fail(
        &mut self,
        step: DrillStep,
        phase: DrillPhase,
        detail: impl Into<String>,
        elapsed: Duration,
    ) {
        self.steps.push(StepOutcome {
            step,
            phase,
            passed: false,
            detail: detail.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    /// Seals the report with the run result.
    pub fn finish(&mut self, error: Option<&DrillError>) {
        self.total_elapsed_ms = epoch_ms().saturating_sub(self.started_at_epoch_ms);
        match error {
            None => self.verdict = Verdict::Pass,
            Some(e) => {
                self.verdict = Verdict::Fail;
                self.failure = Some(e.to_string());
            }
        }
    }

    /// Returns the failing step, if the run failed.
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| !s.passed)
    }

    /// Renders the human-readable report. The last line is always
    /// `PASS` or `FAIL` (or `IN PROGRESS` for an unsealed report).
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("drill {} against {}\n", self.run_id, self.target));
        for step in &self.steps {
            let mark = if step.passed { "ok" } else { "FAILED" };
            out.push_str(&format!(
                "  [{mark}] {} ({}) {}ms: {}\n",
                step.step, step.phase, step.elapsed_ms, step.detail
            ));
        }
        if let Some(failure) = &self.failure {
            out.push_str(&format!("  error: {failure}\n"));
        }
        let verdict = match self.verdict {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::InProgress => "IN PROGRESS",
        };
        out.push_str(verdict);
        out.push('\n');
        out
    }
}
