// src/exec/runner.rs

//! Process runner for a single command unit.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::engine::{FailureReason, RunEvent, UnitOutcome};
use crate::registry::{UnitId, UnitLaunch};
use crate::types::StreamKind;

use super::terminate::{platform_terminator, terminate, Terminator};

/// Knobs shared by every runner of a run.
#[derive(Clone)]
pub struct RunnerOptions {
    /// Delay between the graceful and the forced termination signal.
    pub grace_period: Duration,
    /// Upper bound for reaping a terminated child and for draining its
    /// output pumps.
    pub drain_timeout: Duration,
    pub terminator: Arc<dyn Terminator>,
}

impl RunnerOptions {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            grace_period,
            drain_timeout: Duration::from_secs(1),
            terminator: platform_terminator(),
        }
    }
}

impl std::fmt::Debug for RunnerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerOptions")
            .field("grace_period", &self.grace_period)
            .field("drain_timeout", &self.drain_timeout)
            .finish_non_exhaustive()
    }
}

/// Run one unit's process to completion.
///
/// Emits `UnitStarted` once the process is spawned, one `Output` event per
/// line on either stream, and always exactly one `UnitFinished` last. The
/// outcome is also returned to the caller.
pub async fn run_unit(
    launch: UnitLaunch,
    runtime_tx: mpsc::Sender<RunEvent>,
    options: RunnerOptions,
) -> UnitOutcome {
    let unit = launch.id;
    let project = launch.project.clone();

    let outcome = match run_unit_inner(launch, &runtime_tx, &options).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(%project, %unit, error = %err, "unit execution error");
            UnitOutcome::Failed(FailureReason::Io(format!("{err:#}")))
        }
    };

    if runtime_tx
        .send(RunEvent::UnitFinished {
            unit,
            outcome: outcome.clone(),
        })
        .await
        .is_err()
    {
        debug!(%project, %unit, "runtime gone before unit outcome could be reported");
    }

    outcome
}

async fn run_unit_inner(
    mut launch: UnitLaunch,
    runtime_tx: &mpsc::Sender<RunEvent>,
    options: &RunnerOptions,
) -> anyhow::Result<UnitOutcome> {
    let unit = launch.id;

    if launch.cancel.is_cancelled() {
        debug!(project = %launch.project, %unit, "unit cancelled before spawn");
        return Ok(UnitOutcome::Exited);
    }

    let mut cmd = Command::new(&launch.program);
    cmd.args(&launch.args)
        .current_dir(&launch.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // New process group so the whole subtree can be signalled together.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(
                project = %launch.project,
                %unit,
                program = %launch.program,
                error = %err,
                "failed to spawn unit process"
            );
            return Ok(UnitOutcome::Failed(FailureReason::Spawn(err.to_string())));
        }
    };

    let pid = child.id();
    info!(
        project = %launch.project,
        %unit,
        ?pid,
        program = %launch.program,
        args = ?launch.args,
        "unit process started"
    );

    if runtime_tx
        .send(RunEvent::UnitStarted { unit, pid })
        .await
        .is_err()
    {
        debug!(%unit, "runtime gone; process will be killed on drop");
    }

    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump_lines(
            stdout,
            unit,
            StreamKind::Stdout,
            runtime_tx.clone(),
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump_lines(
            stderr,
            unit,
            StreamKind::Stderr,
            runtime_tx.clone(),
        )));
    }

    // Whichever comes first: the process exits on its own, or this unit's
    // token is cancelled.
    let outcome = tokio::select! {
        status = child.wait() => {
            let status = status.with_context(|| {
                format!("waiting for '{}' in project '{}'", launch.program, launch.project)
            })?;
            let outcome = classify_exit(status);
            info!(
                project = %launch.project,
                %unit,
                exit_code = ?status.code(),
                outcome = ?outcome,
                "unit process exited"
            );
            outcome
        }

        _ = launch.cancel.cancelled() => {
            info!(
                project = %launch.project,
                %unit,
                ?pid,
                "cancellation requested; terminating process group"
            );
            terminate(options.terminator.as_ref(), &mut child, options.grace_period).await;

            match tokio::time::timeout(options.drain_timeout, child.wait()).await {
                Ok(Ok(status)) => debug!(%unit, ?status, "cancelled process reaped"),
                Ok(Err(err)) => warn!(%unit, error = %err, "failed to reap cancelled process"),
                Err(_) => {
                    warn!(%unit, ?pid, "cancelled process still alive after forced termination");
                    let _ = child.start_kill();
                }
            }
            UnitOutcome::Exited
        }
    };

    drain_pumps(pumps, options.drain_timeout).await;
    Ok(outcome)
}

/// Map a wait status to an outcome. Only called when the process exited on
/// its own, so a signal here was not sent by us.
fn classify_exit(status: ExitStatus) -> UnitOutcome {
    if status.success() {
        return UnitOutcome::Finished;
    }
    if let Some(code) = status.code() {
        return UnitOutcome::Failed(FailureReason::ExitCode(code));
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return UnitOutcome::Failed(FailureReason::Signal(signal));
        }
    }

    UnitOutcome::Failed(FailureReason::ExitCode(-1))
}

/// Forward every line of `reader` as an `Output` event until EOF.
///
/// Reads raw bytes so that non-UTF-8 output degrades to replacement
/// characters instead of ending the stream.
async fn pump_lines<R>(reader: R, unit: UnitId, stream: StreamKind, tx: mpsc::Sender<RunEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx
                    .send(RunEvent::Output { unit, stream, line })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(err) => {
                debug!(%unit, stream = stream.as_str(), error = %err, "output stream read error");
                break;
            }
        }
    }
}

/// Wait for the pumps to reach EOF, bounded by `timeout`.
///
/// A grandchild that outlives the unit can hold the pipe open forever, so
/// stragglers are aborted. Aborted handles are still awaited so that no pump
/// can send after this returns.
async fn drain_pumps(pumps: Vec<JoinHandle<()>>, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    for mut handle in pumps {
        if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
            debug!("output pump still open after unit exit; aborting");
            handle.abort();
            let _ = handle.await;
        }
    }
}
