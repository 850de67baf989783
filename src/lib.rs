//! opsdrill: readiness-honesty drill toolkit.
//!
//! Proves that a service's liveness/readiness signaling stays truthful
//! through a deliberately induced dependency outage: alive and reachable
//! but honestly unready while the dependency is down, ready again within
//! a bounded window afterwards, with no process restart in between.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use opsdrill::prelude::*;
//! use opsdrill::inject::LocalChannel;
//!
//! # async fn demo() -> opsdrill::core::Result<()> {
//! let config = DrillConfig::default();
//! let db = Arc::new(LocalChannel::new(NodeName::Db));
//! let app = Arc::new(LocalChannel::new(NodeName::App));
//! let runner = DrillRunner::new(config, db, app)?;
//! let outcome = runner.run().await;
//! print!("{}", outcome.report.render());
//! # Ok(())
//! # }
//! ```

pub use opsdrill_core as core;
pub use opsdrill_drill as drill;
pub use opsdrill_inject as inject;
pub use opsdrill_probe as probe;

/// Prelude module for common imports.
pub mod prelude {
    pub use opsdrill_core::{
        DrillConfig, DrillError, DrillPhase, DrillRunId, Expectation, NodeName, ProbeRecord,
        ReadinessContract,
    };
    pub use opsdrill_drill::{DrillOutcome, DrillReport, DrillRunner, Verdict, VerifyGate};
    pub use opsdrill_inject::{CommandChannel, IdentityGuard, OutageInjector};
    pub use opsdrill_probe::{EndpointProber, ReachabilityChain, RecoveryPoller, VersionVerifier};
}
