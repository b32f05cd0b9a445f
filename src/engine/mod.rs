// src/engine/mod.rs

//! Orchestration engine for qk.
//!
//! This module ties together:
//! - the run registry (what runs where, and its status)
//! - the process runners, reached through an `ExecutorBackend`
//! - the main event loop that reacts to:
//!   - unit start / output / outcome events from the runners
//!   - cancellation requests and view toggles from the user
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::time::Duration;

use crate::registry::{Status, StatusCounts, UnitId};
use crate::types::{ExitedPolicy, StreamKind};

/// Why a unit failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Process exited with a non-zero code.
    ExitCode(i32),
    /// Process was killed by a signal qk did not send.
    Signal(i32),
    /// Process could not be started.
    Spawn(String),
    /// Pipe or wait failure after the process started.
    Io(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ExitCode(code) => write!(f, "exit code {code}"),
            FailureReason::Signal(sig) => write!(f, "killed by signal {sig}"),
            FailureReason::Spawn(msg) => write!(f, "failed to start: {msg}"),
            FailureReason::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

/// Terminal outcome of one unit's process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Finished,
    Failed(FailureReason),
    /// Stopped by qk's own cancellation.
    Exited,
}

impl UnitOutcome {
    pub fn status(&self) -> Status {
        match self {
            UnitOutcome::Finished => Status::Finished,
            UnitOutcome::Failed(_) => Status::Failed,
            UnitOutcome::Exited => Status::Exited,
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            UnitOutcome::Failed(reason) => Some(reason.to_string()),
            UnitOutcome::Finished | UnitOutcome::Exited => None,
        }
    }
}

/// Display flags the user can flip while a run is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewToggle {
    Scripts,
    Timer,
    Stdout,
    Help,
}

/// Lifecycle of the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Units registered, nothing dispatched yet.
    Initializing,
    /// Units dispatched; at least one not terminal.
    Running,
    /// Cancellation requested; waiting for units to stop.
    Cancelling,
    /// Every unit is terminal.
    Done,
}

/// Final result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub success: bool,
    pub counts: StatusCounts,
    /// The run ended after a cancellation request.
    pub cancelled: bool,
}

/// Options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub exited_policy: ExitedPolicy,
    /// Delay between graceful and forced termination.
    pub grace_period: Duration,
    /// Extra time after the grace period before units still running during
    /// shutdown are marked `Exited` without an outcome.
    pub shutdown_timeout: Duration,
    /// Re-render this often even without events (spinner, stopwatch).
    pub tick_interval: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            exited_policy: ExitedPolicy::Ignore,
            grace_period: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(2),
            tick_interval: None,
        }
    }
}

/// Events flowing into the runtime from runners and the user.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The unit's process was spawned.
    UnitStarted { unit: UnitId, pid: Option<u32> },
    /// The unit produced a line on stdout or stderr.
    Output {
        unit: UnitId,
        stream: StreamKind,
        line: String,
    },
    /// The unit's process is gone. Always the unit's last event.
    UnitFinished { unit: UnitId, outcome: UnitOutcome },
    /// Stop every unit (user quit, Ctrl-C).
    CancelRequested,
    /// The bounded wait after a cancellation ran out.
    CancelDeadlineElapsed,
    /// Flip a display flag.
    ToggleView(ViewToggle),
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
