// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # opsdrill-core
//!
//! Shared primitives for the opsdrill readiness-honesty toolkit.
//!
//! This crate provides the foundational types every other member crate
//! builds on:
//!
//! - [`DrillPhase`]: the strict, forward-only phase state machine
//! - [`DrillConfig`]: configuration resolved once at startup
//! - [`DrillError`]: the fatal-only error taxonomy with stable exit codes
//! - [`ProbeRecord`] / [`Expectation`]: per-check evidence and contracts
//!
//! There is deliberately no I/O here: probing, injection and sequencing
//! live in the sibling crates.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    DependencyConfig, DrillConfig, EndpointConfig, TargetDescriptor, TimingConfig, VerifyConfig,
};
pub use error::{DrillError, Result};
pub use types::{
    DrillPhase, DrillRunId, Expectation, NodeName, ProbeRecord, ReadinessContract, epoch_ms,
};
