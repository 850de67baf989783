// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # opsdrill-inject
//!
//! Fault-injection side of the opsdrill toolkit:
//!
//! - [`CommandChannel`]: the one remote capability the drill needs,
//!   running a command on a named node ([`SshChannel`], [`LocalChannel`])
//! - [`OutageInjector`]: controlled stop/start of the dependency service
//! - [`IdentityGuard`]: proves the primary process was never restarted
//!
//! The [`testing`] module ships a scripted channel for tests.

#![warn(missing_docs)]

pub mod channel;
pub mod identity;
pub mod outage;
pub mod testing;

pub use channel::{ChannelOutput, CommandChannel, LocalChannel, SshChannel};
pub use identity::{IdentityGuard, ProcessIdentity, parse_stat_starttime};
pub use outage::OutageInjector;
