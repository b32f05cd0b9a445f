use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use qk::engine::{FailureReason, RunEvent, UnitOutcome};
use qk::exec::{BackendFuture, ExecutorBackend};
use qk::registry::{UnitId, UnitLaunch};
use qk::types::StreamKind;

/// One step of a scripted unit.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit a stdout line.
    Output(String),
    Sleep(Duration),
    /// Report this outcome and stop.
    Finish(UnitOutcome),
    /// Block until the unit is cancelled, then report `Exited`.
    WaitForCancel,
    /// Block forever and never report, even when cancelled.
    Hang,
    /// Report a spawn failure without ever starting.
    FailSpawn(String),
}

/// A fake executor that:
/// - records which units were dispatched
/// - plays a per-unit script of events instead of running processes.
///
/// Units without a script start and finish successfully right away.
pub struct ScriptedExecutor {
    runtime_tx: mpsc::Sender<RunEvent>,
    scripts: HashMap<UnitId, Vec<Step>>,
    default_script: Vec<Step>,
    dispatched: Arc<Mutex<Vec<UnitId>>>,
    handles: Vec<JoinHandle<()>>,
}

impl ScriptedExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RunEvent>) -> Self {
        Self {
            runtime_tx,
            scripts: HashMap::new(),
            default_script: vec![Step::Finish(UnitOutcome::Finished)],
            dispatched: Arc::new(Mutex::new(Vec::new())),
            handles: Vec::new(),
        }
    }

    pub fn script(mut self, unit: UnitId, steps: Vec<Step>) -> Self {
        self.scripts.insert(unit, steps);
        self
    }

    pub fn default_script(mut self, steps: Vec<Step>) -> Self {
        self.default_script = steps;
        self
    }

    /// Shared list of dispatched unit ids, in dispatch order.
    pub fn dispatched(&self) -> Arc<Mutex<Vec<UnitId>>> {
        Arc::clone(&self.dispatched)
    }
}

/// Shorthand for a failing outcome with an exit code.
pub fn exit_code(code: i32) -> UnitOutcome {
    UnitOutcome::Failed(FailureReason::ExitCode(code))
}

async fn play(mut launch: UnitLaunch, steps: Vec<Step>, tx: mpsc::Sender<RunEvent>) {
    let unit = launch.id;

    if let Some(Step::FailSpawn(msg)) = steps.first() {
        let _ = tx
            .send(RunEvent::UnitFinished {
                unit,
                outcome: UnitOutcome::Failed(FailureReason::Spawn(msg.clone())),
            })
            .await;
        return;
    }

    let _ = tx.send(RunEvent::UnitStarted { unit, pid: None }).await;

    for step in steps {
        match step {
            Step::Output(line) => {
                let _ = tx
                    .send(RunEvent::Output {
                        unit,
                        stream: StreamKind::Stdout,
                        line,
                    })
                    .await;
            }
            Step::Sleep(d) => tokio::time::sleep(d).await,
            Step::Finish(outcome) => {
                let _ = tx.send(RunEvent::UnitFinished { unit, outcome }).await;
                return;
            }
            Step::WaitForCancel => {
                launch.cancel.cancelled().await;
                let _ = tx
                    .send(RunEvent::UnitFinished {
                        unit,
                        outcome: UnitOutcome::Exited,
                    })
                    .await;
                return;
            }
            Step::Hang => std::future::pending::<()>().await,
            Step::FailSpawn(_) => {}
        }
    }

    let _ = tx
        .send(RunEvent::UnitFinished {
            unit,
            outcome: UnitOutcome::Finished,
        })
        .await;
}

impl ExecutorBackend for ScriptedExecutor {
    fn spawn_units(&mut self, units: Vec<UnitLaunch>) -> BackendFuture<'_> {
        for launch in units {
            self.dispatched.lock().unwrap().push(launch.id);
            let steps = self
                .scripts
                .get(&launch.id)
                .cloned()
                .unwrap_or_else(|| self.default_script.clone());
            self.handles
                .push(tokio::spawn(play(launch, steps, self.runtime_tx.clone())));
        }
        Box::pin(async { Ok(()) })
    }

    fn join_all(&mut self) -> BackendFuture<'_> {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        Box::pin(async { Ok(()) })
    }
}
