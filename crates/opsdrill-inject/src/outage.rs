//! Dependency outage injection.
//!
//! Stops and later restarts the dependency service on its node, leaving
//! the primary service untouched. Delivery or command failure here is
//! fatal and never retried: if the fault cannot be injected under
//! control, nothing downstream of it is worth asserting.

use std::sync::Arc;

use opsdrill_core::config::DependencyConfig;
use opsdrill_core::{DrillError, Result};

use crate::channel::CommandChannel;

/// Controlled stop/start of the dependency service.
pub struct OutageInjector {
    channel: Arc<dyn CommandChannel>,
    dependency: DependencyConfig,
}

impl OutageInjector {
    /// Creates an injector driving `dependency` over `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn CommandChannel>, dependency: DependencyConfig) -> Self {
        Self {
            channel,
            dependency,
        }
    }

    /// Stops the dependency service.
    pub async fn stop_dependency(&self) -> Result<()> {
        let command = self.dependency.render_stop();
        tracing::warn!(
            node = %self.channel.node(),
            service = %self.dependency.service,
            %command,
            "inducing dependency outage"
        );
        self.deliver(&command, "stop").await
    }

    /// Starts the dependency service again.
    pub async fn start_dependency(&self) -> Result<()> {
        let command = self.dependency.render_start();
        tracing::info!(
            node = %self.channel.node(),
            service = %self.dependency.service,
            %command,
            "restoring dependency"
        );
        self.deliver(&command, "start").await
    }

    async fn deliver(&self, command: &str, action: &str) -> Result<()> {
        let output = self.channel.run(command).await?;
        if !output.success() {
            return Err(DrillError::injection(format!(
                "{action} '{}' on {} exited {}: {}",
                self.dependency.service,
                self.channel.describe(),
                output.code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}
