//! Bounded readiness recovery polling.
//!
//! After the dependency is restored, readiness is polled at a fixed
//! interval until it goes green or the deadline elapses. Plain
//! poll-with-deadline, no backoff, no jitter. A dependency that becomes
//! ready in the final second must still be detected, so the last attempt
//! is scheduled exactly at the deadline boundary rather than skipped.

use std::time::{Duration, Instant};

use opsdrill_core::config::TimingConfig;
use opsdrill_core::{DrillError, Expectation, Result};

/// Successful recovery observation.
#[derive(Debug, Clone, Copy)]
pub struct Recovery {
    /// Time from the first poll to the green status.
    pub elapsed: Duration,
    /// Number of polls issued, including the successful one.
    pub attempts: u32,
    /// The status that satisfied the expectation.
    pub observed: u16,
}

/// Fixed-interval poller with a hard deadline.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryPoller {
    interval: Duration,
    deadline: Duration,
}

impl RecoveryPoller {
    /// Creates a poller with an explicit interval and deadline.
    #[must_use]
    pub const fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Creates a poller from the drill timing configuration.
    #[must_use]
    pub const fn from_timing(timing: &TimingConfig) -> Self {
        Self::new(timing.poll_interval, timing.recovery_deadline)
    }

    /// Returns the configured deadline.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Polls until the observed status satisfies `expected` or the
    /// deadline elapses.
    ///
    /// The probe closure returns the observed status code, or `None` when
    /// the request itself failed; both count as "not yet recovered". The
    /// sleep before the final attempt is clamped so that attempt lands on
    /// the deadline boundary instead of overshooting it.
    pub async fn poll<F, Fut>(&self, expected: Expectation, mut probe: F) -> Result<Recovery>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<u16>>,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_observed = None;

        loop {
            attempts += 1;
            let observed = probe().await;

            if let Some(code) = observed
                && expected.matches(code)
            {
                let elapsed = start.elapsed();
                tracing::info!(attempts, ?elapsed, code, "readiness recovered");
                return Ok(Recovery {
                    elapsed,
                    attempts,
                    observed: code,
                });
            }

            last_observed = observed;
            tracing::debug!(attempts, ?observed, "still not ready");

            let elapsed = start.elapsed();
            if elapsed >= self.deadline {
                return Err(DrillError::RecoveryTimeout {
                    deadline: self.deadline,
                    elapsed,
                    last_observed,
                });
            }
            tokio::time::sleep(self.interval.min(self.deadline - elapsed)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointProber;
    use crate::testing::MockService;
    use opsdrill_core::ReadinessContract;
    use opsdrill_core::config::{EndpointConfig, TargetDescriptor};

    const READY: Expectation = Expectation::Exactly(200);

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
    async fn test_immediate_success_takes_one_attempt() {
        let service = MockService::start(200, 200).await;
        let prober = prober_for(&service);
        let poller = RecoveryPoller::new(Duration::from_millis(50), Duration::from_secs(5));

        let recovery = poller
            .poll(READY, || prober.observe("/ready"))
            .await
            .expect("ready");
        assert_eq!(recovery.attempts, 1);
        assert_eq!(recovery.observed, 200);
    }

    #[tokio::test]
    async fn test_eventual_success_after_unready_polls() {
        let service = MockService::start(200, 200).await;
        service.script_readiness(vec![503, 503, 200]);
        let prober = prober_for(&service);
        let poller = RecoveryPoller::new(Duration::from_millis(30), Duration::from_secs(5));

        let recovery = poller
            .poll(READY, || prober.observe("/ready"))
            .await
            .expect("ready");
        assert_eq!(recovery.attempts, 3);
        assert!(recovery.elapsed >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_timeout_reports_last_observed_status() {
        let service = MockService::start(200, 503).await;
        let prober = prober_for(&service);
        let poller = RecoveryPoller::new(Duration::from_millis(40), Duration::from_millis(200));

        let err = poller
            .poll(READY, || prober.observe("/ready"))
            .await
            .unwrap_err();
        match err {
            DrillError::RecoveryTimeout {
                deadline,
                elapsed,
                last_observed,
            } => {
                assert_eq!(deadline, Duration::from_millis(200));
                assert!(elapsed >= deadline);
                assert_eq!(last_observed, Some(503));
            }
            other => panic!("expected timeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_success_at_deadline_boundary_is_success() {
        // Readiness flips green only on the 4th poll; with a 60ms interval
        // and a 150ms deadline the 4th poll is the clamped final attempt
        // at the boundary. It must be detected as success, not timeout.
        let service = MockService::start(200, 200).await;
        service.script_readiness(vec![503, 503, 503, 200]);
        let prober = prober_for(&service);
        let poller = RecoveryPoller::new(Duration::from_millis(60), Duration::from_millis(150));

        let recovery = poller
            .poll(READY, || prober.observe("/ready"))
            .await
            .expect("boundary recovery should succeed");
        assert_eq!(recovery.attempts, 4);
        assert!(recovery.elapsed >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_polling_after_success_is_idempotent() {
        let service = MockService::start(200, 200).await;
        let prober = prober_for(&service);
        let poller = RecoveryPoller::new(Duration::from_millis(20), Duration::from_millis(200));

        for _ in 0..3 {
            let recovery = poller
                .poll(READY, || prober.observe("/ready"))
                .await
                .expect("ready");
            assert_eq!(recovery.attempts, 1);
        }
    }

    #[tokio::test]
    async fn test_request_failures_count_as_not_ready() {
        // Nothing listens on the port: every poll observes None until the
        // deadline, then the timeout carries last_observed = None.
        let target = TargetDescriptor {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let timing = TimingConfig {
            connect_timeout: Duration::from_millis(100),
            http_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        let prober = EndpointProber::new(
            &target,
            EndpointConfig::default(),
            &timing,
            ReadinessContract::default(),
        )
        .expect("client should build");
        let poller = RecoveryPoller::new(Duration::from_millis(30), Duration::from_millis(120));

        let err = poller
            .poll(READY, || prober.observe("/ready"))
            .await
            .unwrap_err();
        match err {
            DrillError::RecoveryTimeout { last_observed, .. } => {
                assert_eq!(last_observed, None);
            }
            other => panic!("expected timeout, got {other}"),
        }
    }
}
