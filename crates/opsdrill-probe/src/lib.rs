// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # opsdrill-probe
//!
//! Probing primitives for the opsdrill readiness-honesty toolkit:
//!
//! - [`EndpointProber`]: dual-endpoint liveness/readiness assertions per
//!   drill phase
//! - [`ReachabilityChain`]: transport-layer TCP probing with a
//!   tool/socket/HTTP fallback chain
//! - [`RecoveryPoller`]: fixed-interval, deadline-bounded readiness poll
//! - [`VersionVerifier`]: thin build-info (`/version`) contract check
//!
//! The [`testing`] module ships a scripted mock service used by this
//! crate's tests and by the drill runner's integration tests.

#![warn(missing_docs)]

pub mod endpoint;
pub mod recovery;
pub mod tcp;
pub mod testing;
pub mod version;

pub use endpoint::EndpointProber;
pub use recovery::{Recovery, RecoveryPoller};
pub use tcp::{HttpFallbackProbe, NcProbe, ReachabilityChain, ReachabilityProbe, SocketProbe};
pub use version::{BuildInfo, VersionVerifier};
