//! Test support: a scripted command channel.
//!
//! Queues canned responses and records every delivered command, so
//! injector/guard tests and the drill runner's integration tests can run
//! a full drill without touching ssh or a real `/proc`.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use opsdrill_core::{DrillError, NodeName, Result};

use crate::channel::{ChannelOutput, CommandChannel};

enum Scripted {
    Output(ChannelOutput),
    Failure(String),
}

/// Command channel that replays a script instead of running anything.
///
/// Responses are consumed in FIFO order; when the script runs dry every
/// further command succeeds with empty output, which keeps happy-path
/// tests from having to enqueue dozens of `respond_ok("")`.
pub struct ScriptedChannel {
    node: NodeName,
    script: Mutex<VecDeque<Scripted>>,
    delivered: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    /// Creates a scripted channel standing in for `node`.
    #[must_use]
    pub fn new(node: NodeName) -> Self {
        Self {
            node,
            script: Mutex::new(VecDeque::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Queues a successful response with the given stdout.
    pub fn respond_ok(&self, stdout: impl Into<String>) {
        self.push(Scripted::Output(ChannelOutput {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }));
    }

    /// Queues a non-zero exit with the given stderr.
    pub fn respond_err(&self, code: i32, stderr: impl Into<String>) {
        self.push(Scripted::Output(ChannelOutput {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }));
    }

    /// Queues a channel-level delivery failure.
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.push(Scripted::Failure(reason.into()));
    }

    /// Commands delivered so far, in order.
    #[must_use]
    pub fn delivered(&self) -> Vec<String> {
        lock(&self.delivered).clone()
    }

    fn push(&self, entry: Scripted) {
        lock(&self.script).push_back(entry);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    fn node(&self) -> NodeName {
        self.node
    }

    fn describe(&self) -> String {
        format!("scripted ({})", self.node)
    }

    async fn run(&self, command: &str) -> Result<ChannelOutput> {
        lock(&self.delivered).push(command.to_string());
        match lock(&self.script).pop_front() {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Failure(reason)) => Err(DrillError::channel(reason)),
            None => Ok(ChannelOutput {
                code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }
}
