//! Transport-layer reachability probing.
//!
//! The drill must distinguish "process crashed" from "process alive but
//! dependency degraded", so this probe may not depend on the dependency
//! being healthy, or on any single tool being installed. Mechanisms are
//! tried in priority order and the first success wins: a dedicated TCP
//! probe tool (`nc`), a raw socket connect, then an HTTP client with a
//! short connect timeout as the degraded fallback.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::Command;

use opsdrill_core::config::TimingConfig;
use opsdrill_core::{DrillError, Result};

/// One way of attempting a bare TCP handshake.
///
/// Providers are deliberately uniform: availability, then a boolean
/// attempt. No provider may rely on the application layer answering
/// sensibly, only on the listener accepting a connection.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Provider name for logs and failure reports.
    fn name(&self) -> &'static str;

    /// Returns true if this provider can run on this machine.
    async fn available(&self) -> bool;

    /// Attempts the handshake; true means the port accepted a connection.
    async fn attempt(&self, host: &str, port: u16) -> bool;
}

/// Dedicated TCP probe tool (`nc -z`).
pub struct NcProbe {
    connect_timeout: Duration,
}

impl NcProbe {
    /// Creates an `nc`-based probe.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ReachabilityProbe for NcProbe {
    fn name(&self) -> &'static str {
        "nc"
    }

    async fn available(&self) -> bool {
        Command::new("nc")
            .arg("-h")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    async fn attempt(&self, host: &str, port: u16) -> bool {
        let wait_secs = self.connect_timeout.as_secs().max(1);
        let status = Command::new("nc")
            .arg("-z")
            .arg("-w")
            .arg(wait_secs.to_string())
            .arg(host)
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        matches!(status, Ok(s) if s.success())
    }
}

/// Raw socket connect via the runtime.
pub struct SocketProbe {
    connect_timeout: Duration,
}

impl SocketProbe {
    /// Creates a raw-socket probe.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ReachabilityProbe for SocketProbe {
    fn name(&self) -> &'static str {
        "socket"
    }

    async fn available(&self) -> bool {
        true
    }

    async fn attempt(&self, host: &str, port: u16) -> bool {
        let connect = TcpStream::connect((host, port));
        matches!(
            tokio::time::timeout(self.connect_timeout, connect).await,
            Ok(Ok(_))
        )
    }
}

/// HTTP client with a short connect timeout, as the degraded fallback.
///
/// Any HTTP response, or any error past the connect stage, proves the
/// listener is accepting connections; only connect/timeout failures count
/// as unreachable.
pub struct HttpFallbackProbe {
    connect_timeout: Duration,
}

impl HttpFallbackProbe {
    /// Creates an HTTP-fallback probe.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpFallbackProbe {
    fn name(&self) -> &'static str {
        "http-fallback"
    }

    async fn available(&self) -> bool {
        true
    }

    async fn attempt(&self, host: &str, port: u16) -> bool {
        let Ok(client) = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.connect_timeout * 2)
            .build()
        else {
            return false;
        };

        match client.get(format!("http://{host}:{port}/")).send().await {
            Ok(_) => true,
            Err(e) => !(e.is_connect() || e.is_timeout()),
        }
    }
}

/// Prioritized chain of reachability providers.
pub struct ReachabilityChain {
    probes: Vec<Box<dyn ReachabilityProbe>>,
}

impl ReachabilityChain {
    /// Builds the standard chain: `nc`, raw socket, HTTP fallback.
    #[must_use]
    pub fn standard(timing: &TimingConfig) -> Self {
        Self {
            probes: vec![
                Box::new(NcProbe::new(timing.connect_timeout)),
                Box::new(SocketProbe::new(timing.connect_timeout)),
                Box::new(HttpFallbackProbe::new(timing.connect_timeout)),
            ],
        }
    }

    /// Builds a chain from explicit providers (test seam).
    #[must_use]
    pub fn with_probes(probes: Vec<Box<dyn ReachabilityProbe>>) -> Self {
        Self { probes }
    }

    /// Runs the chain; returns the name of the first provider that
    /// reached the port.
    ///
    /// Unavailable providers are skipped. Only if every provider fails
    /// is the target declared unreachable.
    pub async fn verify(&self, host: &str, port: u16) -> Result<&'static str> {
        let mut tried = Vec::new();

        for probe in &self.probes {
            if !probe.available().await {
                tracing::debug!(provider = probe.name(), "probe unavailable, skipping");
                continue;
            }
            if probe.attempt(host, port).await {
                tracing::debug!(provider = probe.name(), host, port, "tcp reachability confirmed");
                return Ok(probe.name());
            }
            tried.push(probe.name());
        }

        let reason = if tried.is_empty() {
            "no reachability provider available".to_string()
        } else {
            format!("all providers failed: {}", tried.join(", "))
        };
        Err(DrillError::transport(host, port, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockService;

    struct ScriptedProbe {
        name: &'static str,
        available: bool,
        reachable: bool,
    }

    #[async_trait]
    impl ReachabilityProbe for ScriptedProbe {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn available(&self) -> bool {
            self.available
        }

        async fn attempt(&self, _host: &str, _port: u16) -> bool {
            self.reachable
        }
    }

    fn scripted(name: &'static str, available: bool, reachable: bool) -> Box<dyn ReachabilityProbe> {
        Box::new(ScriptedProbe {
            name,
            available,
            reachable,
        })
    }

    #[tokio::test]
    async fn test_socket_probe_reaches_live_listener() {
        let service = MockService::start(200, 200).await;
        let probe = SocketProbe::new(Duration::from_millis(500));
        assert!(probe.attempt("127.0.0.1", service.port()).await);
    }

    #[tokio::test]
    async fn test_socket_probe_fails_on_closed_port() {
        let probe = SocketProbe::new(Duration::from_millis(300));
        assert!(!probe.attempt("127.0.0.1", 1).await);
    }

    #[tokio::test]
    async fn test_http_fallback_counts_any_response_as_reachable() {
        // Even a 404/500 from the listener proves the transport is up.
        let service = MockService::start(500, 503).await;
        let probe = HttpFallbackProbe::new(Duration::from_millis(500));
        assert!(probe.attempt("127.0.0.1", service.port()).await);
    }

    #[tokio::test]
    async fn test_chain_first_success_wins() {
        let chain = ReachabilityChain::with_probes(vec![
            scripted("first", true, true),
            scripted("second", true, true),
        ]);
        let winner = chain.verify("127.0.0.1", 9999).await.expect("reachable");
        assert_eq!(winner, "first");
    }

    #[tokio::test]
    async fn test_chain_skips_unavailable_providers() {
        let chain = ReachabilityChain::with_probes(vec![
            scripted("missing-tool", false, true),
            scripted("fallback", true, true),
        ]);
        let winner = chain.verify("127.0.0.1", 9999).await.expect("reachable");
        assert_eq!(winner, "fallback");
    }

    #[tokio::test]
    async fn test_chain_falls_through_failures() {
        let chain = ReachabilityChain::with_probes(vec![
            scripted("a", true, false),
            scripted("b", true, false),
            scripted("c", true, true),
        ]);
        let winner = chain.verify("127.0.0.1", 9999).await.expect("reachable");
        assert_eq!(winner, "c");
    }

    #[tokio::test]
    async fn test_chain_reports_all_failures() {
        let chain = ReachabilityChain::with_probes(vec![
            scripted("a", true, false),
            scripted("b", false, false),
            scripted("c", true, false),
        ]);
        let err = chain.verify("10.0.0.5", 8000).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.5:8000"));
        assert!(msg.contains("a, c"), "got: {msg}");
        assert_eq!(err.exit_code(), 5);
    }

    #[tokio::test]
    async fn test_standard_chain_reaches_mock_service() {
        let service = MockService::start(200, 503).await;
        let timing = TimingConfig {
            connect_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let chain = ReachabilityChain::standard(&timing);
        assert!(chain.verify("127.0.0.1", service.port()).await.is_ok());
    }
}
