//! Drill configuration types.
//!
//! Configuration is resolved exactly once at process start: defaults,
//! then an optional TOML file, then environment/CLI overrides applied by
//! the binary. It is immutable for the rest of the run. Nothing in the
//! drill reads the environment after startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DrillError, Result};
use crate::types::{NodeName, ReadinessContract};

/// Full configuration for a drill run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Which readiness statuses count as honestly unready during the outage.
    #[serde(default)]
    pub readiness_contract: ReadinessContract,

    /// Primary service under test.
    #[serde(default)]
    pub target: TargetDescriptor,

    /// HTTP paths probed on the target.
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Intervals, deadlines and timeouts.
    #[serde(default)]
    pub timing: TimingConfig,

    /// The dependency whose outage is induced.
    #[serde(default)]
    pub dependency: DependencyConfig,

    /// External verification command gate.
    #[serde(default)]
    pub verify: VerifyConfig,
}

impl DrillConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DrillError::config(format!("failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DrillError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the whole configuration.
    pub fn validate(&self) -> Result<()> {
        self.target.validate()?;
        self.endpoints.validate()?;
        self.timing.validate()?;
        self.dependency.validate()?;
        self.verify.validate()?;
        Ok(())
    }
}

/// The service under test: where it runs and how to reach it.
///
/// Immutable for the run; the drill never re-resolves its target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Node the primary service runs on.
    #[serde(default = "default_target_node")]
    pub node: NodeName,

    /// Hostname or address the probes connect to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Service port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Process name for the restart guard; `None` disables the guard.
    #[serde(default = "default_process_name")]
    pub process_name: Option<String>,
}

fn default_target_node() -> NodeName {
    NodeName::App
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_process_name() -> Option<String> {
    Some("mock-exchange".to_string())
}

impl Default for TargetDescriptor {
    fn default() -> Self {
        Self {
            node: default_target_node(),
            host: default_host(),
            port: default_port(),
            process_name: default_process_name(),
        }
    }
}

impl TargetDescriptor {
    /// Validates the target.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(DrillError::config("target host cannot be empty"));
        }
        if self.port == 0 {
            return Err(DrillError::config("target port cannot be 0"));
        }
        if let Some(name) = &self.process_name
            && name.trim().is_empty()
        {
            return Err(DrillError::config(
                "process_name cannot be empty (omit it to disable the restart guard)",
            ));
        }
        Ok(())
    }

    /// Returns `host:port` for log lines.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// HTTP paths probed on the target service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Liveness path: 200 whenever the process is alive.
    #[serde(default = "default_liveness_path")]
    pub liveness_path: String,

    /// Readiness path: 200 only when the service can do its job.
    #[serde(default = "default_readiness_path")]
    pub readiness_path: String,

    /// Build/version metadata path.
    #[serde(default = "default_version_path")]
    pub version_path: String,
}

fn default_liveness_path() -> String {
    "/health".to_string()
}

fn default_readiness_path() -> String {
    "/ready".to_string()
}

fn default_version_path() -> String {
    "/version".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            liveness_path: default_liveness_path(),
            readiness_path: default_readiness_path(),
            version_path: default_version_path(),
        }
    }
}

impl EndpointConfig {
    /// Validates the endpoint paths.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("liveness_path", &self.liveness_path),
            ("readiness_path", &self.readiness_path),
            ("version_path", &self.version_path),
        ] {
            if !path.starts_with('/') {
                return Err(DrillError::config(format!(
                    "{name} must start with '/': got '{path}'"
                )));
            }
        }
        Ok(())
    }
}

/// Intervals, deadlines and timeouts for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Interval between readiness polls during recovery.
    #[serde(default = "default_poll_interval")]
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Deadline for readiness to return after the dependency is restored.
    #[serde(default = "default_recovery_deadline")]
    #[serde(with = "humantime_serde")]
    pub recovery_deadline: Duration,

    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout")]
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,

    /// Connect timeout for transport-reachability probes.
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_recovery_deadline() -> Duration {
    Duration::from_secs(30)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            recovery_deadline: default_recovery_deadline(),
            http_timeout: default_http_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl TimingConfig {
    /// Validates the timing values.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(DrillError::config("poll_interval must be greater than 0"));
        }
        if self.recovery_deadline < self.poll_interval {
            return Err(DrillError::config(
                "recovery_deadline must be at least one poll_interval",
            ));
        }
        if self.http_timeout.is_zero() {
            return Err(DrillError::config("http_timeout must be greater than 0"));
        }
        if self.connect_timeout.is_zero() {
            return Err(DrillError::config("connect_timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// The dependency whose outage the drill induces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Node the dependency runs on.
    #[serde(default = "default_dependency_node")]
    pub node: NodeName,

    /// Service name substituted into the command templates.
    #[serde(default = "default_dependency_service")]
    pub service: String,

    /// Stop command template; `{service}` is substituted.
    #[serde(default = "default_stop_command")]
    pub stop_command: String,

    /// Start command template; `{service}` is substituted.
    #[serde(default = "default_start_command")]
    pub start_command: String,
}

fn default_dependency_node() -> NodeName {
    NodeName::Db
}

fn default_dependency_service() -> String {
    "postgresql".to_string()
}

fn default_stop_command() -> String {
    "sudo systemctl stop {service}".to_string()
}

fn default_start_command() -> String {
    "sudo systemctl start {service}".to_string()
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            node: default_dependency_node(),
            service: default_dependency_service(),
            stop_command: default_stop_command(),
            start_command: default_start_command(),
        }
    }
}

impl DependencyConfig {
    /// Validates the dependency settings.
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(DrillError::config("dependency service cannot be empty"));
        }
        if self.stop_command.trim().is_empty() {
            return Err(DrillError::config("stop_command cannot be empty"));
        }
        if self.start_command.trim().is_empty() {
            return Err(DrillError::config("start_command cannot be empty"));
        }
        Ok(())
    }

    /// Renders the stop command for this dependency.
    #[must_use]
    pub fn render_stop(&self) -> String {
        self.stop_command.replace("{service}", &self.service)
    }

    /// Renders the start command for this dependency.
    #[must_use]
    pub fn render_start(&self) -> String {
        self.start_command.replace("{service}", &self.service)
    }
}

/// External verification command, gated on exit code only.
///
/// The drill does not reimplement whatever "verify" means for the project;
/// it runs the command and treats its exit status as ground truth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Command line to run (e.g. `make verify`); `None` disables the gate.
    #[serde(default)]
    pub command: Option<String>,

    /// Also run the gate before inducing the outage.
    #[serde(default)]
    pub preflight: bool,
}

impl VerifyConfig {
    /// Validates the verify settings.
    pub fn validate(&self) -> Result<()> {
        if let Some(command) = &self.command
            && command.trim().is_empty()
        {
            return Err(DrillError::config(
                "verify command cannot be empty (omit it to disable the gate)",
            ));
        }
        Ok(())
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a human-readable string.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a human-readable string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DrillConfig::default();
        assert_eq!(config.target.node, NodeName::App);
        assert_eq!(config.target.host, "127.0.0.1");
        assert_eq!(config.target.port, 8000);
        assert_eq!(config.endpoints.liveness_path, "/health");
        assert_eq!(config.endpoints.readiness_path, "/ready");
        assert_eq!(config.endpoints.version_path, "/version");
        assert_eq!(config.timing.poll_interval, Duration::from_secs(2));
        assert_eq!(config.timing.recovery_deadline, Duration::from_secs(30));
        assert_eq!(config.dependency.node, NodeName::Db);
        assert!(config.verify.command.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_validate_empty_host() {
        let target = TargetDescriptor {
            host: "  ".to_string(),
            ..Default::default()
        };
        assert!(target.validate().is_err());
    }

    #[test]
    fn test_target_validate_zero_port() {
        let target = TargetDescriptor {
            port: 0,
            ..Default::default()
        };
        assert!(target.validate().is_err());
    }

    #[test]
    fn test_target_addr() {
        let target = TargetDescriptor {
            host: "10.0.0.5".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(target.addr(), "10.0.0.5:8080");
    }

    #[test]
    fn test_endpoint_paths_must_be_absolute() {
        let endpoints = EndpointConfig {
            readiness_path: "ready".to_string(),
            ..Default::default()
        };
        let err = endpoints.validate().unwrap_err();
        assert!(err.to_string().contains("readiness_path"));
    }

    #[test]
    fn test_timing_validate_zero_interval() {
        let timing = TimingConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_timing_validate_deadline_shorter_than_interval() {
        let timing = TimingConfig {
            poll_interval: Duration::from_secs(10),
            recovery_deadline: Duration::from_secs(5),
            ..Default::default()
        };
        let err = timing.validate().unwrap_err();
        assert!(err.to_string().contains("recovery_deadline"));
    }

    #[test]
    fn test_dependency_command_rendering() {
        let dep = DependencyConfig::default();
        assert_eq!(dep.render_stop(), "sudo systemctl stop postgresql");
        assert_eq!(dep.render_start(), "sudo systemctl start postgresql");
    }

    #[test]
    fn test_dependency_custom_template() {
        let dep = DependencyConfig {
            service: "pg".to_string(),
            stop_command: "docker stop {service}".to_string(),
            start_command: "docker start {service}".to_string(),
            ..Default::default()
        };
        assert_eq!(dep.render_stop(), "docker stop pg");
        assert_eq!(dep.render_start(), "docker start pg");
    }

    #[test]
    fn test_dependency_validate_empty_service() {
        let dep = DependencyConfig {
            service: String::new(),
            ..Default::default()
        };
        assert!(dep.validate().is_err());
    }

    #[test]
    fn test_verify_validate_empty_command() {
        let verify = VerifyConfig {
            command: Some("   ".to_string()),
            preflight: false,
        };
        assert!(verify.validate().is_err());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = DrillConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: DrillConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.target.port, config.target.port);
        assert_eq!(parsed.timing.poll_interval, config.timing.poll_interval);
    }

    #[test]
    fn test_config_parses_humantime_durations() {
        let toml = r#"
            [timing]
            poll_interval = "500ms"
            recovery_deadline = "1m"
        "#;
        let config: DrillConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.timing.poll_interval, Duration::from_millis(500));
        assert_eq!(config.timing.recovery_deadline, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_node() {
        let toml = r#"
            [target]
            node = "worker-9"
        "#;
        assert!(toml::from_str::<DrillConfig>(toml).is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn valid_timings_always_validate(
                interval_ms in 1u64..5_000,
                extra_ms in 0u64..60_000,
            ) {
                let timing = TimingConfig {
                    poll_interval: Duration::from_millis(interval_ms),
                    recovery_deadline: Duration::from_millis(interval_ms + extra_ms),
                    ..Default::default()
                };
                prop_assert!(timing.validate().is_ok());
            }
        }
    }
}
