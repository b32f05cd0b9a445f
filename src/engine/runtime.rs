// src/engine/runtime.rs

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{Instant as TokioInstant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::errors::{QkError, Result};
use crate::exec::ExecutorBackend;
use crate::registry::UnitLaunch;
use crate::view::Presenter;

use super::core::CoreRuntime;
use super::{CoreCommand, CoreStep, RunEvent, RunSummary};

/// Drives the core state machine in response to `RunEvent`s, delegates
/// process execution to an `ExecutorBackend` and drawing to a `Presenter`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the run
/// semantics. This struct handles async IO: reading events from the channel,
/// dispatching units, firing cancellation and enforcing the shutdown
/// deadline.
pub struct Runtime<E: ExecutorBackend, P: Presenter> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RunEvent>,
    executor: E,
    presenter: P,
    started_at: Instant,
    cancel_deadline: Option<TokioInstant>,
}

impl<E: ExecutorBackend, P: Presenter> fmt::Debug for Runtime<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("cancel_deadline", &self.cancel_deadline)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend, P: Presenter> Runtime<E, P> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RunEvent>,
        executor: E,
        presenter: P,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            presenter,
            started_at: Instant::now(),
            cancel_deadline: None,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches every unit.
    /// - Consumes `RunEvent`s from `event_rx` and feeds them into the core.
    /// - Executes commands returned by the core (dispatch, cancel, render).
    /// - Returns once the core reports the run complete.
    ///
    /// If anything fails along the way (a presenter write, a dispatch) every
    /// unit is cancelled and its runner awaited before the error is returned,
    /// so no child process outlives the run.
    pub async fn run(mut self) -> Result<RunSummary> {
        match self.drive().await {
            Ok(summary) => Ok(summary),
            Err(err) => {
                error!(error = %err, "run aborted; stopping every unit");
                self.abort_units().await;
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<RunSummary> {
        info!(units = self.core.registry().unit_count(), "qk runtime started");
        self.started_at = Instant::now();

        let start = self.core.start();
        if let Some(summary) = self.execute_step(start).await? {
            return Ok(summary);
        }

        let mut ticker = self.core.options().tick_interval.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            let event = tokio::select! {
                maybe = self.event_rx.recv() => match maybe {
                    Some(event) => event,
                    None => {
                        return Err(QkError::Other(anyhow::anyhow!(
                            "runtime event channel closed before every unit finished"
                        )));
                    }
                },

                _ = sleep_until_deadline(self.cancel_deadline) => {
                    self.cancel_deadline = None;
                    RunEvent::CancelDeadlineElapsed
                }

                _ = next_tick(&mut ticker) => {
                    self.presenter.render(self.core.registry(), self.started_at.elapsed())?;
                    continue;
                }
            };

            debug!(?event, "runtime received event");

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);
            if let Some(summary) = self.execute_step(step).await? {
                info!(success = summary.success, "runtime exiting");
                return Ok(summary);
            }
        }
    }

    /// Execute every command of one step. Returns the summary once the run
    /// is complete.
    async fn execute_step(&mut self, step: CoreStep) -> Result<Option<RunSummary>> {
        let mut completed = None;

        for command in step.commands {
            match command {
                CoreCommand::DispatchUnits(units) => self.dispatch(units).await?,
                CoreCommand::CancelAll => self.cancel_all(),
                CoreCommand::Render => {
                    self.presenter
                        .render(self.core.registry(), self.started_at.elapsed())?;
                }
                CoreCommand::ToggleView(toggle) => self.presenter.toggle(toggle),
                CoreCommand::Complete(summary) => completed = Some(summary),
            }
        }

        let summary = match completed {
            Some(summary) => summary,
            None if !step.keep_running => self.core.summary(),
            None => return Ok(None),
        };

        self.presenter
            .finish(self.core.registry(), &summary, self.started_at.elapsed())?;
        self.executor.join_all().await?;
        Ok(Some(summary))
    }

    async fn dispatch(&mut self, units: Vec<UnitLaunch>) -> Result<()> {
        if units.is_empty() {
            return Ok(());
        }
        let ids: Vec<_> = units.iter().map(|u| u.id.to_string()).collect();
        debug!(?ids, "dispatching units");
        self.executor.spawn_units(units).await
    }

    fn cancel_all(&mut self) {
        let options = self.core.options();
        let deadline = TokioInstant::now() + options.grace_period + options.shutdown_timeout;
        info!(
            grace_ms = options.grace_period.as_millis() as u64,
            shutdown_timeout_ms = options.shutdown_timeout.as_millis() as u64,
            "firing cancellation for every unit"
        );
        self.cancel_deadline = Some(deadline);
        self.core.cancel_all();
    }

    /// Cancel every unit and wait for the runners to wind down. Nothing reads
    /// events any more, so the channel is closed first and runners blocked on
    /// a full channel give up.
    async fn abort_units(&mut self) {
        self.event_rx.close();
        self.core.cancel_all();
        if let Err(err) = self.executor.join_all().await {
            warn!(error = %err, "failed to join unit runners after an aborted run");
        }
    }
}

async fn sleep_until_deadline(deadline: Option<TokioInstant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
