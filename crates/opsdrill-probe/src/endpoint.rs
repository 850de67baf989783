//! Dual-endpoint health/readiness probing.
//!
//! The prober issues plain GETs against the liveness and readiness paths
//! and compares observed status codes against the expectations of the
//! current drill phase. Bodies are ignored; the status code is the whole
//! contract for these two endpoints.

use std::time::Instant;

use opsdrill_core::config::{EndpointConfig, TargetDescriptor, TimingConfig};
use opsdrill_core::{
    DrillError, DrillPhase, Expectation, ProbeRecord, ReadinessContract, Result, epoch_ms,
};

/// HTTP prober for the liveness/readiness pair on one target.
pub struct EndpointProber {
    client: reqwest::Client,
    base_url: String,
    endpoints: EndpointConfig,
    contract: ReadinessContract,
}

impl EndpointProber {
    /// Creates a prober for the given target.
    pub fn new(
        target: &TargetDescriptor,
        endpoints: EndpointConfig,
        timing: &TimingConfig,
        contract: ReadinessContract,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timing.http_timeout)
            .connect_timeout(timing.connect_timeout)
            .build()
            .map_err(|e| DrillError::http(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("http://{}", target.addr()),
            endpoints,
            contract,
        })
    }

    /// Returns the readiness path this prober polls.
    #[must_use]
    pub fn readiness_path(&self) -> &str {
        &self.endpoints.readiness_path
    }

    /// Issues a single GET and records what came back.
    ///
    /// A request-level failure (refused, timed out) is recorded as
    /// `observed: None` rather than an error; the caller decides whether
    /// that is fatal for its phase.
    pub async fn probe(&self, path: &str, expected: Expectation) -> ProbeRecord {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let observed = match self.client.get(&url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                tracing::debug!(path, error = %e, "endpoint probe request failed");
                None
            }
        };

        ProbeRecord {
            endpoint: path.to_string(),
            expected,
            observed,
            latency_ms: start.elapsed().as_millis() as u64,
            checked_at_epoch_ms: epoch_ms(),
        }
    }

    /// Observes the status of a path without asserting anything.
    ///
    /// Returns the status code, or `None` if the request itself failed.
    pub async fn observe(&self, path: &str) -> Option<u16> {
        self.probe(path, Expectation::Exactly(200)).await.observed
    }

    /// Probes both endpoints for display, asserting nothing.
    pub async fn snapshot(&self) -> (ProbeRecord, ProbeRecord) {
        let liveness = self
            .probe(&self.endpoints.liveness_path, Expectation::Exactly(200))
            .await;
        let readiness = self
            .probe(&self.endpoints.readiness_path, Expectation::Exactly(200))
            .await;
        (liveness, readiness)
    }

    /// Probes a path and fails the drill if the expectation is not met.
    async fn assert_status(
        &self,
        phase: DrillPhase,
        path: &str,
        expected: Expectation,
    ) -> Result<ProbeRecord> {
        let record = self.probe(path, expected).await;

        match record.observed {
            None => Err(DrillError::http(format!(
                "GET {path} failed during {phase} phase: no HTTP response"
            ))),
            Some(observed) if expected.matches(observed) => {
                tracing::debug!(%phase, path, observed, "endpoint check passed");
                Ok(record)
            }
            Some(observed) => Err(DrillError::ProtocolViolation {
                phase,
                endpoint: path.to_string(),
                expected,
                observed,
            }),
        }
    }

    /// Baseline contract: both endpoints green before anything is touched.
    pub async fn assert_baseline(&self) -> Result<Vec<ProbeRecord>> {
        let liveness = self
            .assert_status(
                DrillPhase::Baseline,
                &self.endpoints.liveness_path,
                Expectation::Exactly(200),
            )
            .await?;
        let readiness = self
            .assert_status(
                DrillPhase::Baseline,
                &self.endpoints.readiness_path,
                Expectation::Exactly(200),
            )
            .await?;
        Ok(vec![liveness, readiness])
    }

    /// Outage contract: alive but honestly unready.
    ///
    /// Liveness must stay 200; the dependency loss must not kill the
    /// process. Readiness must be non-green per the configured contract;
    /// a 200 here is the dishonest-readiness violation this tool exists
    /// to catch.
    pub async fn assert_outage(&self) -> Result<Vec<ProbeRecord>> {
        let liveness = self
            .assert_status(
                DrillPhase::OutageConfirmed,
                &self.endpoints.liveness_path,
                Expectation::Exactly(200),
            )
            .await?;
        let readiness = self
            .assert_status(
                DrillPhase::OutageConfirmed,
                &self.endpoints.readiness_path,
                self.contract.outage_expectation(),
            )
            .await?;
        Ok(vec![liveness, readiness])
    }

    /// Polls readiness with the given poller until it satisfies the
    /// recovery contract or the deadline elapses.
    pub async fn poll_ready(&self, poller: &crate::recovery::RecoveryPoller) -> Result<crate::recovery::Recovery> {
        poller
            .poll(self.contract.recovery_expectation(), || {
                self.observe(&self.endpoints.readiness_path)
            })
            .await
    }

    /// Recovery contract: both endpoints green again.
    pub async fn assert_recovered(&self) -> Result<Vec<ProbeRecord>> {
        let liveness = self
            .assert_status(
                DrillPhase::RecoveryConfirmed,
                &self.endpoints.liveness_path,
                Expectation::Exactly(200),
            )
            .await?;
        let readiness = self
            .assert_status(
                DrillPhase::RecoveryConfirmed,
                &self.endpoints.readiness_path,
                self.contract.recovery_expectation(),
            )
            .await?;
        Ok(vec![liveness, readiness])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockService;
    use opsdrill_core::config::TargetDescriptor;

    fn prober_for(service: &MockService) -> EndpointProber {
        let target = TargetDescriptor {
            host: "127.0.0.1".to_string(),
            port: service.port(),
            ..Default::default()
        };
        EndpointProber::new(
            &target,
            EndpointConfig::default(),
            &TimingConfig::default(),
            ReadinessContract::default(),
        )
        .expect("client should build")
    }

    #[tokio::test]
    async fn test_baseline_passes_when_both_green() {
        let service = MockService::start(200, 200).await;
        let prober = prober_for(&service);

        let records = prober.assert_baseline().await.expect("baseline");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(ProbeRecord::satisfied));
    }

    #[tokio::test]
    async fn test_baseline_fails_when_readiness_red() {
        let service = MockService::start(200, 503).await;
        let prober = prober_for(&service);

        let err = prober.assert_baseline().await.unwrap_err();
        match err {
            DrillError::ProtocolViolation {
                phase,
                endpoint,
                observed,
                ..
            } => {
                assert_eq!(phase, DrillPhase::Baseline);
                assert_eq!(endpoint, "/ready");
                assert_eq!(observed, 503);
            }
            other => panic!("expected protocol violation, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_outage_passes_when_alive_but_unready() {
        let service = MockService::start(200, 503).await;
        let prober = prober_for(&service);

        let records = prober.assert_outage().await.expect("outage contract");
        assert_eq!(records[0].observed, Some(200));
        assert_eq!(records[1].observed, Some(503));
    }

    #[tokio::test]
    async fn test_outage_accepts_any_non_2xx_readiness() {
        let service = MockService::start(200, 500).await;
        let prober = prober_for(&service);
        assert!(prober.assert_outage().await.is_ok());
    }

    #[tokio::test]
    async fn test_dishonest_readiness_is_fatal() {
        // Dependency is down but the service still says ready: the single
        // most important failure this tool exists to catch.
        let service = MockService::start(200, 200).await;
        let prober = prober_for(&service);

        let err = prober.assert_outage().await.unwrap_err();
        assert!(err.is_dishonest_readiness(), "got: {err}");
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_outage_fails_when_liveness_red() {
        let service = MockService::start(500, 503).await;
        let prober = prober_for(&service);

        let err = prober.assert_outage().await.unwrap_err();
        match err {
            DrillError::ProtocolViolation { endpoint, observed, .. } => {
                assert_eq!(endpoint, "/health");
                assert_eq!(observed, 500);
            }
            other => panic!("expected protocol violation, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_strict_contract_rejects_500_readiness() {
        let service = MockService::start(200, 500).await;
        let target = TargetDescriptor {
            host: "127.0.0.1".to_string(),
            port: service.port(),
            ..Default::default()
        };
        let prober = EndpointProber::new(
            &target,
            EndpointConfig::default(),
            &TimingConfig::default(),
            ReadinessContract::Exact503,
        )
        .expect("client should build");

        let err = prober.assert_outage().await.unwrap_err();
        assert!(err.to_string().contains("expected 503"), "got: {err}");
    }

    #[tokio::test]
    async fn test_probe_records_transport_failure_as_none() {
        // Nothing listens on this port.
        let target = TargetDescriptor {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let timing = TimingConfig {
            connect_timeout: std::time::Duration::from_millis(200),
            http_timeout: std::time::Duration::from_millis(500),
            ..Default::default()
        };
        let prober = EndpointProber::new(
            &target,
            EndpointConfig::default(),
            &timing,
            ReadinessContract::default(),
        )
        .expect("client should build");

        let record = prober.probe("/health", Expectation::Exactly(200)).await;
        assert_eq!(record.observed, None);
        assert!(!record.satisfied());
    }

    #[tokio::test]
    async fn test_snapshot_asserts_nothing() {
        let service = MockService::start(500, 503).await;
        let prober = prober_for(&service);

        let (liveness, readiness) = prober.snapshot().await;
        assert_eq!(liveness.observed, Some(500));
        assert_eq!(readiness.observed, Some(503));
    }
}
