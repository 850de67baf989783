//! The verification aggregator.
//!
//! Sequences the whole drill in strict order: baseline asserts, outage
//! injection, transport probe, outage asserts, dependency restore,
//! bounded recovery poll, recovered asserts, restart guard, with the
//! external verification gate woven in at its configured points. Any
//! step failing short-circuits the rest. There are no retries at this
//! level; the only retry loop in the tool is inside the recovery poll.

use std::sync::Arc;
use std::time::Instant;

use opsdrill_core::{DrillConfig, DrillError, DrillPhase, DrillRunId, Result};
use opsdrill_inject::{CommandChannel, IdentityGuard, OutageInjector, ProcessIdentity};
use opsdrill_probe::{EndpointProber, ReachabilityChain, RecoveryPoller, VersionVerifier};

use crate::gate::VerifyGate;
use crate::report::{DrillReport, DrillStep};

/// Result of a full drill run: the report plus the failing error, if any.
pub struct DrillOutcome {
    /// Step-by-step record of the run.
    pub report: DrillReport,
    /// The error that aborted the run, when the verdict is Fail.
    pub error: Option<DrillError>,
}

impl DrillOutcome {
    /// Returns true if every step passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.error.is_none()
    }

    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map_or(0, DrillError::exit_code)
    }
}

/// Runs the readiness-honesty drill against one target.
pub struct DrillRunner {
    config: DrillConfig,
    run_id: DrillRunId,
    prober: EndpointProber,
    version: VersionVerifier,
    reachability: ReachabilityChain,
    poller: RecoveryPoller,
    injector: OutageInjector,
    guard: Option<IdentityGuard>,
    gate: Option<VerifyGate>,
}

impl DrillRunner {
    /// Builds a runner from a validated configuration.
    ///
    /// `dependency_channel` must reach the dependency's node;
    /// `target_channel` must reach the primary service's node (used only
    /// by the restart guard, so it is ignored when no process name is
    /// configured).
    pub fn new(
        config: DrillConfig,
        dependency_channel: Arc<dyn CommandChannel>,
        target_channel: Arc<dyn CommandChannel>,
    ) -> Result<Self> {
        config.validate()?;

        let prober = EndpointProber::new(
            &config.target,
            config.endpoints.clone(),
            &config.timing,
            config.readiness_contract,
        )?;
        let version = VersionVerifier::new(
            &config.target,
            &config.endpoints.version_path,
            &config.timing,
            None,
        )?;
        let reachability = ReachabilityChain::standard(&config.timing);
        let poller = RecoveryPoller::from_timing(&config.timing);
        let injector = OutageInjector::new(dependency_channel, config.dependency.clone());
        let guard = config
            .target
            .process_name
            .as_ref()
            .map(|name| IdentityGuard::new(target_channel, name.clone()));
        let gate = config.verify.command.as_ref().map(|c| VerifyGate::new(c.clone()));

        Ok(Self {
            config,
            run_id: DrillRunId::new(),
            prober,
            version,
            reachability,
            poller,
            injector,
            guard,
            gate,
        })
    }

    /// Returns this run's identifier.
    #[must_use]
    pub const fn run_id(&self) -> DrillRunId {
        self.run_id
    }

    /// Executes the full drill sequence.
    pub async fn run(&self) -> DrillOutcome {
        tracing::info!(
            run_id = %self.run_id,
            target = %self.config.target.addr(),
            dependency = %self.config.dependency.service,
            "starting readiness-honesty drill"
        );

        let mut report = DrillReport::new(self.run_id, self.config.target.addr());
        let result = self.run_inner(&mut report).await;

        report.finish(result.as_ref().err());
        match &result {
            Ok(()) => tracing::info!(run_id = %self.run_id, "drill passed"),
            Err(e) => tracing::error!(run_id = %self.run_id, error = %e, "drill failed"),
        }

        DrillOutcome {
            report,
            error: result.err(),
        }
    }

    async fn run_inner(&self, report: &mut DrillReport) -> Result<()> {
        let mut phase = DrillPhase::Baseline;

        // Baseline: nothing touched yet, everything must be green.
        let baseline_identity = self.capture_identity(report, phase).await?;
        self.step(report, DrillStep::BaselineEndpoints, phase, async {
            let records = self.prober.assert_baseline().await?;
            Ok(describe_records(&records))
        })
        .await?;
        self.step(report, DrillStep::BaselineVersion, phase, async {
            let info = self.version.verify().await?;
            Ok(format!("service '{}' version {}", info.service, info.version))
        })
        .await?;
        if self.config.verify.preflight {
            self.gate_step(report, DrillStep::PreflightGate, phase).await?;
        }

        // Outage: stop the dependency, prove the service stays alive and
        // honestly unready.
        self.step(report, DrillStep::InduceOutage, phase, async {
            self.injector.stop_dependency().await?;
            Ok(format!("stopped '{}'", self.config.dependency.service))
        })
        .await?;
        phase = advance(phase)?;

        self.step(report, DrillStep::TransportProbe, phase, async {
            let provider = self
                .reachability
                .verify(&self.config.target.host, self.config.target.port)
                .await?;
            Ok(format!("reachable via {provider}"))
        })
        .await?;
        self.step(report, DrillStep::OutageEndpoints, phase, async {
            let records = self.prober.assert_outage().await?;
            Ok(describe_records(&records))
        })
        .await?;
        phase = advance(phase)?;

        self.gate_step(report, DrillStep::OutageGate, phase).await?;

        // Recovery: restore the dependency and wait for readiness to
        // come back on its own, with no restart allowed.
        self.step(report, DrillStep::RestoreDependency, phase, async {
            self.injector.start_dependency().await?;
            Ok(format!("started '{}'", self.config.dependency.service))
        })
        .await?;
        phase = advance(phase)?;

        self.step(report, DrillStep::RecoveryPoll, phase, async {
            let recovery = self.prober.poll_ready(&self.poller).await?;
            Ok(format!(
                "ready after {:?} ({} polls)",
                recovery.elapsed, recovery.attempts
            ))
        })
        .await?;
        self.step(report, DrillStep::RecoveredEndpoints, phase, async {
            let records = self.prober.assert_recovered().await?;
            Ok(describe_records(&records))
        })
        .await?;
        phase = advance(phase)?;

        if let (Some(guard), Some(baseline)) = (&self.guard, &baseline_identity) {
            self.step(report, DrillStep::IdentityCheck, phase, async {
                guard.verify_unchanged(baseline).await?;
                Ok(format!("unchanged: {baseline}"))
            })
            .await?;
        }
        self.gate_step(report, DrillStep::FinalGate, phase).await?;

        Ok(())
    }

    async fn capture_identity(
        &self,
        report: &mut DrillReport,
        phase: DrillPhase,
    ) -> Result<Option<ProcessIdentity>> {
        let Some(guard) = &self.guard else {
            tracing::warn!("no process name configured; restart guard disabled");
            return Ok(None);
        };

        let start = Instant::now();
        match guard.capture().await {
            Ok(identity) => {
                report.record_pass(
                    DrillStep::CaptureIdentity,
                    phase,
                    identity.to_string(),
                    start.elapsed(),
                );
                Ok(Some(identity))
            }
            Err(e) => {
                report.record_fail(DrillStep::CaptureIdentity, phase, e.to_string(), start.elapsed());
                Err(e)
            }
        }
    }

    async fn gate_step(
        &self,
        report: &mut DrillReport,
        step: DrillStep,
        phase: DrillPhase,
    ) -> Result<()> {
        let Some(gate) = &self.gate else {
            return Ok(());
        };
        self.step(report, step, phase, async {
            gate.check().await?;
            Ok(format!("'{}' exited 0", gate.command()))
        })
        .await
    }

    async fn step(
        &self,
        report: &mut DrillReport,
        step: DrillStep,
        phase: DrillPhase,
        work: impl Future<Output = Result<String>>,
    ) -> Result<()> {
        tracing::info!(%step, %phase, "drill step");
        let start = Instant::now();
        match work.await {
            Ok(detail) => {
                report.record_pass(step, phase, detail, start.elapsed());
                Ok(())
            }
            Err(e) => {
                report.record_fail(step, phase, e.to_string(), start.elapsed());
                Err(e)
            }
        }
    }
}

/// Advances the phase state machine by exactly one step.
fn advance(phase: DrillPhase) -> Result<DrillPhase> {
    phase.next().ok_or_else(|| {
        DrillError::config(format!("no phase follows {phase}; sequence corrupted"))
    })
}

fn describe_records(records: &[opsdrill_core::ProbeRecord]) -> String {
    records
        .iter()
        .map(|r| {
            let observed = r
                .observed
                .map_or_else(|| "no response".to_string(), |c| c.to_string());
            format!("{} {}", r.endpoint, observed)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
