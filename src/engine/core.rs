// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RunEvent`]s and produces:
//! - an updated registry and run phase
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the channel
//! - handing `UnitLaunch`es to the executor
//! - firing cancellation tokens and arming the shutdown deadline
//! - rendering through the presenter
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use tracing::{debug, warn};

use crate::engine::event_handlers::{
    handle_cancel_deadline, handle_cancel_requested, handle_output, handle_toggle_view,
    handle_unit_finished, handle_unit_started, maybe_complete, summarize, CoreCommand, CoreStep,
};
use crate::engine::{RunEvent, RunOptions, RunPhase, RunSummary};
use crate::registry::Registry;

/// Pure core runtime state.
///
/// This owns the run registry (the only mutable state of a run), the current
/// phase and the run options. It has **no** channels, no Tokio types, and
/// does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    registry: Registry,
    phase: RunPhase,
    options: RunOptions,
}

impl CoreRuntime {
    pub fn new(registry: Registry, options: RunOptions) -> Self {
        Self {
            registry,
            phase: RunPhase::Initializing,
            options,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn is_done(&self) -> bool {
        self.phase == RunPhase::Done
    }

    /// Summary of the registry as it stands now.
    pub fn summary(&self) -> RunSummary {
        summarize(
            &self.registry,
            self.options.exited_policy,
            matches!(self.phase, RunPhase::Cancelling),
        )
    }

    /// Fire every unit's cancellation token.
    pub fn cancel_all(&self) {
        self.registry.cancel_all();
    }

    /// Dispatch every unit: Initializing → Running.
    ///
    /// A registry without units completes immediately.
    pub fn start(&mut self) -> CoreStep {
        if self.phase != RunPhase::Initializing {
            warn!(phase = ?self.phase, "start called twice; ignoring");
            return CoreStep {
                commands: Vec::new(),
                keep_running: !self.is_done(),
            };
        }

        if self.registry.unit_count() == 0 {
            debug!("no units registered; run is trivially complete");
            return maybe_complete(&self.registry, &mut self.phase, &self.options, Vec::new());
        }

        self.phase = RunPhase::Running;
        CoreStep::running(vec![
            CoreCommand::DispatchUnits(self.registry.launches()),
            CoreCommand::Render,
        ])
    }

    /// Handle a single run event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RunEvent) -> CoreStep {
        match event {
            RunEvent::UnitStarted { unit, pid } => {
                handle_unit_started(&mut self.registry, unit, pid)
            }
            RunEvent::Output { unit, stream, line } => {
                handle_output(&mut self.registry, unit, stream, line)
            }
            RunEvent::UnitFinished { unit, outcome } => handle_unit_finished(
                &mut self.registry,
                &mut self.phase,
                &self.options,
                unit,
                outcome,
            ),
            RunEvent::CancelRequested => {
                handle_cancel_requested(&mut self.registry, &mut self.phase, &self.options)
            }
            RunEvent::CancelDeadlineElapsed => {
                handle_cancel_deadline(&mut self.registry, &mut self.phase, &self.options)
            }
            RunEvent::ToggleView(toggle) => handle_toggle_view(toggle),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{FailureReason, UnitOutcome};
    use crate::registry::{Project, RenderFn, Status, UnitId};
    use crate::types::{ExitedPolicy, StreamKind};

    fn render() -> RenderFn {
        Arc::new(|status, _| status.to_string())
    }

    fn core(projects: usize, policy: ExitedPolicy) -> CoreRuntime {
        let projects = (0..projects)
            .map(|i| Project::new(format!("p{i}"), format!("/w/p{i}")))
            .collect();
        let mut registry = Registry::new(projects, 3);
        registry.add_command(render(), "yarn", &["build:prod"]);
        CoreRuntime::new(
            registry,
            RunOptions {
                exited_policy: policy,
                ..RunOptions::default()
            },
        )
    }

    fn finished(unit: UnitId, outcome: UnitOutcome) -> RunEvent {
        RunEvent::UnitFinished { unit, outcome }
    }

    fn completion(step: &CoreStep) -> Option<RunSummary> {
        step.commands.iter().find_map(|c| match c {
            CoreCommand::Complete(summary) => Some(*summary),
            _ => None,
        })
    }

    #[test]
    fn start_dispatches_every_unit() {
        let mut core = core(3, ExitedPolicy::Ignore);
        let step = core.start();

        assert!(step.keep_running);
        assert_eq!(core.phase(), RunPhase::Running);
        let dispatched = step.commands.iter().find_map(|c| match c {
            CoreCommand::DispatchUnits(units) => Some(units.len()),
            _ => None,
        });
        assert_eq!(dispatched, Some(3));
    }

    #[test]
    fn empty_registry_completes_on_start() {
        let mut core = CoreRuntime::new(Registry::new(Vec::new(), 3), RunOptions::default());
        let step = core.start();
        assert!(!step.keep_running);
        assert_eq!(completion(&step).map(|s| s.success), Some(true));
        assert!(core.is_done());
    }

    #[test]
    fn run_completes_when_last_unit_finishes() {
        let mut core = core(2, ExitedPolicy::Ignore);
        core.start();

        let step = core.step(finished(UnitId::new(1, 0), UnitOutcome::Finished));
        assert!(step.keep_running);
        assert!(completion(&step).is_none());

        let step = core.step(finished(
            UnitId::new(0, 0),
            UnitOutcome::Failed(FailureReason::ExitCode(1)),
        ));
        assert!(!step.keep_running);
        let summary = completion(&step).unwrap();
        assert!(!summary.success);
        assert_eq!(summary.counts.failed, 1);
        assert_eq!(
            core.registry().unit(UnitId::new(0, 0)).unwrap().detail(),
            Some("exit code 1")
        );
    }

    #[test]
    fn output_is_buffered_without_changing_status() {
        let mut core = core(1, ExitedPolicy::Ignore);
        core.start();
        let unit = UnitId::new(0, 0);
        core.step(RunEvent::UnitStarted { unit, pid: Some(42) });
        for i in 0..5 {
            core.step(RunEvent::Output {
                unit,
                stream: StreamKind::Stdout,
                line: format!("line {i}"),
            });
        }

        let u = core.registry().unit(unit).unwrap();
        assert_eq!(u.status(), Status::Running);
        assert_eq!(u.output().lines().collect::<Vec<_>>(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn cancel_is_idempotent_and_fires_tokens_once() {
        let mut core = core(2, ExitedPolicy::Ignore);
        core.start();

        let first = core.step(RunEvent::CancelRequested);
        assert!(matches!(first.commands[0], CoreCommand::CancelAll));
        assert_eq!(core.phase(), RunPhase::Cancelling);

        let second = core.step(RunEvent::CancelRequested);
        assert!(second.commands.is_empty());
        assert!(second.keep_running);
    }

    #[test]
    fn cancelled_run_success_follows_exited_policy() {
        for (policy, expected) in [(ExitedPolicy::Ignore, true), (ExitedPolicy::Fail, false)] {
            let mut core = core(2, policy);
            core.start();
            core.step(finished(UnitId::new(0, 0), UnitOutcome::Finished));
            core.step(RunEvent::CancelRequested);
            let step = core.step(finished(UnitId::new(1, 0), UnitOutcome::Exited));

            let summary = completion(&step).unwrap();
            assert!(summary.cancelled);
            assert_eq!(summary.success, expected, "policy {policy:?}");
        }
    }

    #[test]
    fn deadline_forces_remaining_units_to_exited() {
        let mut core = core(2, ExitedPolicy::Ignore);
        core.start();
        core.step(RunEvent::UnitStarted {
            unit: UnitId::new(0, 0),
            pid: None,
        });
        core.step(RunEvent::CancelRequested);

        let step = core.step(RunEvent::CancelDeadlineElapsed);
        assert!(!step.keep_running);
        assert_eq!(completion(&step).unwrap().counts.exited, 2);

        // A late outcome cannot regress the forced status.
        core.step(finished(UnitId::new(0, 0), UnitOutcome::Finished));
        assert_eq!(
            core.registry().unit(UnitId::new(0, 0)).unwrap().status(),
            Status::Exited
        );
    }

    #[test]
    fn deadline_without_cancellation_is_ignored() {
        let mut core = core(1, ExitedPolicy::Ignore);
        core.start();
        let step = core.step(RunEvent::CancelDeadlineElapsed);
        assert!(step.keep_running);
        assert_eq!(core.phase(), RunPhase::Running);
    }

    #[test]
    fn cancel_before_start_exits_every_unit() {
        let mut core = core(2, ExitedPolicy::Ignore);
        let step = core.step(RunEvent::CancelRequested);
        let summary = completion(&step).unwrap();
        assert_eq!(summary.counts.exited, 2);
        assert!(summary.cancelled);
        assert!(core.start().commands.is_empty());
    }
}
