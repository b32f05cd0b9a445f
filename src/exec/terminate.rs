// src/exec/terminate.rs

//! Two-step process termination: a graceful request, a grace period, then a
//! forced kill.
//!
//! On unix the runner starts every command as the leader of its own process
//! group, so [`ProcessGroupTerminator`] can signal the whole subtree the
//! command created (shell wrappers, dev servers, file watchers), not just the
//! direct child. Other platforms fall back to killing the direct child.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

/// Strategy for stopping a running command.
///
/// Both steps must be idempotent and must succeed when the process (group)
/// has already gone away.
pub trait Terminator: Send + Sync {
    /// Ask the process to stop (SIGTERM on unix).
    fn graceful(&self, child: &mut Child) -> io::Result<()>;

    /// Make the process stop (SIGKILL on unix).
    fn forced(&self, child: &mut Child) -> io::Result<()>;
}

/// Signals the child's whole process group.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessGroupTerminator;

#[cfg(unix)]
impl Terminator for ProcessGroupTerminator {
    fn graceful(&self, child: &mut Child) -> io::Result<()> {
        signal_group(child, libc::SIGTERM)
    }

    fn forced(&self, child: &mut Child) -> io::Result<()> {
        signal_group(child, libc::SIGKILL)
    }
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: libc::c_int) -> io::Result<()> {
    // `id()` is `None` once the child has been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: killpg has no memory-safety preconditions; the group id comes
    // from a child we spawned with `process_group(0)`.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

/// Kills only the direct child; used where process groups are unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildTerminator;

impl Terminator for ChildTerminator {
    fn graceful(&self, _child: &mut Child) -> io::Result<()> {
        Ok(())
    }

    fn forced(&self, child: &mut Child) -> io::Result<()> {
        match child.start_kill() {
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }
}

/// The strategy to use on the current platform.
pub fn platform_terminator() -> Arc<dyn Terminator> {
    #[cfg(unix)]
    {
        Arc::new(ProcessGroupTerminator)
    }
    #[cfg(not(unix))]
    {
        Arc::new(ChildTerminator)
    }
}

/// Run the escalation: graceful, wait `grace`, forced.
///
/// The forced step is sent unconditionally, even if the process already left
/// after the graceful request; descendants that ignored it are still caught.
/// Signal delivery errors are logged, never returned.
pub async fn terminate(terminator: &dyn Terminator, child: &mut Child, grace: Duration) {
    let pid = child.id();

    if let Err(e) = terminator.graceful(child) {
        warn!(?pid, error = %e, "failed to send graceful termination signal");
    }

    tokio::time::sleep(grace).await;

    if let Err(e) = terminator.forced(child) {
        warn!(?pid, error = %e, "failed to send forced termination signal");
    } else {
        debug!(?pid, "forced termination signal sent");
    }
}
