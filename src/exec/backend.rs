// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning runners
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production runner in [`super::runner`].
//!
//! - `RealExecutorBackend` spawns one [`run_unit`] task per unit.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which units were dispatched and directly emits `RunEvent`s.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{RunEvent, UnitOutcome};
use crate::errors::Result;
use crate::registry::UnitLaunch;

use super::runner::{run_unit, RunnerOptions};

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Trait abstracting how units are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    /// Start the given units.
    ///
    /// Must not wait for them to finish: outcomes are reported as
    /// `RunEvent::UnitFinished` on the runtime channel.
    fn spawn_units(&mut self, units: Vec<UnitLaunch>) -> BackendFuture<'_>;

    /// Called once the run is done, before the runtime returns.
    fn join_all(&mut self) -> BackendFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RunEvent>,
    options: RunnerOptions,
    handles: Vec<JoinHandle<UnitOutcome>>,
}

impl RealExecutorBackend {
    pub fn new(runtime_tx: mpsc::Sender<RunEvent>, options: RunnerOptions) -> Self {
        Self {
            runtime_tx,
            options,
            handles: Vec::new(),
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_units(&mut self, units: Vec<UnitLaunch>) -> BackendFuture<'_> {
        for launch in units {
            debug!(unit = %launch.id, project = %launch.project, "dispatching unit");
            self.handles.push(tokio::spawn(run_unit(
                launch,
                self.runtime_tx.clone(),
                self.options.clone(),
            )));
        }
        Box::pin(async { Ok(()) })
    }

    /// Wait for runner tasks to return, long enough for a cancelled runner to
    /// finish its termination sequence, then abort the rest. Dropping an
    /// aborted runner kills its child (`kill_on_drop`).
    fn join_all(&mut self) -> BackendFuture<'_> {
        let handles = std::mem::take(&mut self.handles);
        let timeout = self.options.grace_period + self.options.drain_timeout;

        Box::pin(async move {
            let deadline = tokio::time::Instant::now() + timeout;
            for mut handle in handles {
                match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => warn!(error = %err, "unit runner task failed"),
                    Err(_) => {
                        warn!("unit runner still busy after the run finished; aborting");
                        handle.abort();
                    }
                }
            }
            Ok(())
        })
    }
}
