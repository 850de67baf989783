//! Build/version metadata verification.
//!
//! The service exposes a build-info endpoint whose JSON must carry
//! non-empty `service` and `version` fields, the guard against
//! stale-deploy confusion. This verifier is deliberately thin: fetch,
//! parse, check the two required fields, optionally match the service
//! name. Everything else in the payload is informational.

use serde::{Deserialize, Serialize};

use opsdrill_core::config::{TargetDescriptor, TimingConfig};
use opsdrill_core::{DrillError, DrillPhase, Expectation, Result};

/// Build and runtime metadata reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Service name. Required, non-empty.
    pub service: String,
    /// Deployed version. Required, non-empty.
    pub version: String,
    /// Deployment environment.
    #[serde(default)]
    pub env: Option<String>,
    /// Effective log level.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Git revision the build came from.
    #[serde(default)]
    pub git_sha: Option<String>,
    /// Build timestamp.
    #[serde(default)]
    pub build_time: Option<String>,
}

impl BuildInfo {
    /// Checks the required-field contract.
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(DrillError::http(
                "version payload has empty required field 'service'",
            ));
        }
        if self.version.trim().is_empty() {
            return Err(DrillError::http(
                "version payload has empty required field 'version'",
            ));
        }
        Ok(())
    }
}

/// Thin verifier for the build-info endpoint.
pub struct VersionVerifier {
    client: reqwest::Client,
    url: String,
    path: String,
    expected_service: Option<String>,
}

impl VersionVerifier {
    /// Creates a verifier for the given target.
    pub fn new(
        target: &TargetDescriptor,
        version_path: &str,
        timing: &TimingConfig,
        expected_service: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timing.http_timeout)
            .connect_timeout(timing.connect_timeout)
            .build()
            .map_err(|e| DrillError::http(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            url: format!("http://{}{}", target.addr(), version_path),
            path: version_path.to_string(),
            expected_service,
        })
    }

    /// Fetches and verifies the build info.
    pub async fn verify(&self) -> Result<BuildInfo> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DrillError::http(format!("GET {} failed: {e}", self.path)))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(DrillError::ProtocolViolation {
                phase: DrillPhase::Baseline,
                endpoint: self.path.clone(),
                expected: Expectation::Exactly(200),
                observed: status,
            });
        }

        let info: BuildInfo = response
            .json()
            .await
            .map_err(|e| DrillError::http(format!("version payload invalid: {e}")))?;
        info.validate()?;

        if let Some(expected) = &self.expected_service
            && &info.service != expected
        {
            return Err(DrillError::http(format!(
                "version endpoint reported service '{}', expected '{expected}'",
                info.service
            )));
        }

        tracing::info!(service = %info.service, version = %info.version, "build info verified");
        Ok(info)
    }
}
