// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::engine::{RunOptions, RunPhase, RunSummary, UnitOutcome, ViewToggle};
use crate::registry::{Registry, Status, UnitId, UnitLaunch};
use crate::types::{ExitedPolicy, StreamKind};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Start these units.
    DispatchUnits(Vec<UnitLaunch>),
    /// Fire every unit's cancellation token and arm the shutdown deadline.
    CancelAll,
    /// Registry changed; redraw.
    Render,
    /// Flip a presenter display flag.
    ToggleView(ViewToggle),
    /// Every unit is terminal; this is the final command of a run.
    Complete(RunSummary),
}

/// Decision returned by the core after handling a single `RunEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn idle() -> Self {
        Self::running(Vec::new())
    }
}

/// Fold the registry into a summary.
///
/// Success requires no `Failed` unit; under `ExitedPolicy::Fail` it also
/// requires no `Exited` unit.
pub fn summarize(registry: &Registry, policy: ExitedPolicy, cancelled: bool) -> RunSummary {
    let counts = registry.status_counts();
    let exited_fails = policy == ExitedPolicy::Fail && counts.exited > 0;
    RunSummary {
        success: counts.failed == 0 && !exited_fails,
        counts,
        cancelled,
    }
}

/// Move to `Done` if every unit is terminal. Safe to call on every event.
pub fn maybe_complete(
    registry: &Registry,
    phase: &mut RunPhase,
    options: &RunOptions,
    mut commands: Vec<CoreCommand>,
) -> CoreStep {
    if *phase == RunPhase::Done || !registry.all_terminal() {
        return CoreStep::running(commands);
    }

    let cancelled = *phase == RunPhase::Cancelling;
    *phase = RunPhase::Done;
    let summary = summarize(registry, options.exited_policy, cancelled);
    info!(
        success = summary.success,
        finished = summary.counts.finished,
        failed = summary.counts.failed,
        exited = summary.counts.exited,
        cancelled,
        "run complete"
    );

    commands.push(CoreCommand::Complete(summary));
    CoreStep {
        commands,
        keep_running: false,
    }
}

pub fn handle_unit_started(registry: &mut Registry, unit: UnitId, pid: Option<u32>) -> CoreStep {
    let Some(u) = registry.unit_mut(unit) else {
        warn!(%unit, "start event for unknown unit");
        return CoreStep::idle();
    };

    debug!(%unit, ?pid, "unit started");
    if u.advance(Status::Running, None) {
        CoreStep::running(vec![CoreCommand::Render])
    } else {
        CoreStep::idle()
    }
}

/// Append an output line. Status is unchanged.
pub fn handle_output(
    registry: &mut Registry,
    unit: UnitId,
    stream: StreamKind,
    line: String,
) -> CoreStep {
    let Some(u) = registry.unit_mut(unit) else {
        warn!(%unit, stream = stream.as_str(), "output for unknown unit");
        return CoreStep::idle();
    };

    u.push_output(line);
    CoreStep::running(vec![CoreCommand::Render])
}

/// Record a unit's terminal outcome and check whether the run is done.
pub fn handle_unit_finished(
    registry: &mut Registry,
    phase: &mut RunPhase,
    options: &RunOptions,
    unit: UnitId,
    outcome: UnitOutcome,
) -> CoreStep {
    match registry.unit_mut(unit) {
        Some(u) => {
            debug!(%unit, ?outcome, "unit finished");
            u.advance(outcome.status(), outcome.detail());
        }
        None => {
            warn!(%unit, "outcome for unknown unit");
            return CoreStep::idle();
        }
    }

    maybe_complete(registry, phase, options, vec![CoreCommand::Render])
}

/// Handle a bulk cancellation request.
///
/// - Done or already cancelling: nothing to do.
/// - Nothing dispatched yet: every unit goes straight to `Exited`.
/// - Otherwise: enter `Cancelling` and ask the shell to fire every token.
pub fn handle_cancel_requested(
    registry: &mut Registry,
    phase: &mut RunPhase,
    options: &RunOptions,
) -> CoreStep {
    match *phase {
        RunPhase::Done => CoreStep {
            commands: Vec::new(),
            keep_running: false,
        },
        RunPhase::Cancelling => {
            debug!("cancellation already in progress");
            CoreStep::idle()
        }
        RunPhase::Initializing => {
            info!("cancelled before any unit was started");
            *phase = RunPhase::Cancelling;
            for id in registry.unit_ids() {
                if let Some(u) = registry.unit_mut(id) {
                    u.advance(Status::Exited, None);
                }
            }
            maybe_complete(registry, phase, options, vec![CoreCommand::Render])
        }
        RunPhase::Running => {
            info!(units = registry.unit_count(), "cancelling all units");
            *phase = RunPhase::Cancelling;
            CoreStep::running(vec![CoreCommand::CancelAll, CoreCommand::Render])
        }
    }
}

/// The bounded wait after a cancellation ran out: force every unit that has
/// not reported an outcome to `Exited` so the run can end.
pub fn handle_cancel_deadline(
    registry: &mut Registry,
    phase: &mut RunPhase,
    options: &RunOptions,
) -> CoreStep {
    if *phase != RunPhase::Cancelling {
        debug!(?phase, "cancellation deadline outside of cancellation; ignoring");
        return CoreStep::running(Vec::new());
    }

    for id in registry.unit_ids() {
        let Some(u) = registry.unit_mut(id) else {
            continue;
        };
        if u.status().is_terminal() {
            continue;
        }
        warn!(
            unit = %id,
            command = %u.command_line(),
            status = %u.status(),
            "unit did not report an outcome before the shutdown deadline; marking exited"
        );
        u.advance(
            Status::Exited,
            Some("did not stop before the shutdown deadline".to_string()),
        );
    }

    maybe_complete(registry, phase, options, vec![CoreCommand::Render])
}

pub fn handle_toggle_view(toggle: ViewToggle) -> CoreStep {
    CoreStep::running(vec![CoreCommand::ToggleView(toggle), CoreCommand::Render])
}
