// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # opsdrill-drill
//!
//! The verification aggregator for the opsdrill toolkit:
//!
//! - [`DrillRunner`]: sequences baseline, outage, and recovery in strict
//!   order, short-circuiting on the first failure
//! - [`VerifyGate`]: exit-code gate around the project's own
//!   verification command
//! - [`DrillReport`]: step-by-step record ending in a PASS/FAIL line

#![warn(missing_docs)]

pub mod gate;
pub mod report;
pub mod runner;

pub use gate::VerifyGate;
pub use report::{DrillReport, DrillStep, StepOutcome, Verdict};
pub use runner::{DrillOutcome, DrillRunner};
