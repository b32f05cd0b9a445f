use std::fmt;

/// Lifecycle of a single command unit.
///
/// `Pending → Running → {Finished | Failed | Exited}`. A unit may also go
/// straight from `Pending` to a terminal state (spawn failure, cancellation
/// before start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Running,
    /// Process exited with code 0.
    Finished,
    /// Non-zero exit, spawn error, or killed by a signal qk did not send.
    Failed,
    /// Stopped by qk's own cancellation.
    Exited,
}

impl Status {
    /// Position in the lifecycle; all terminal states share the top rank.
    pub fn rank(self) -> u8 {
        match self {
            Status::Pending => 0,
            Status::Running => 1,
            Status::Finished | Status::Failed | Status::Exited => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_advance_to(self, next: Status) -> bool {
        next.rank() > self.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Finished => "finished",
            Status::Failed => "failed",
            Status::Exited => "exited",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of units in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
    pub exited: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Pending => self.pending += 1,
            Status::Running => self.running += 1,
            Status::Finished => self.finished += 1,
            Status::Failed => self.failed += 1,
            Status::Exited => self.exited += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.running + self.finished + self.failed + self.exited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_never_advance() {
        for from in [Status::Finished, Status::Failed, Status::Exited] {
            for to in [
                Status::Pending,
                Status::Running,
                Status::Finished,
                Status::Failed,
                Status::Exited,
            ] {
                assert!(!from.can_advance_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn pending_may_skip_running() {
        assert!(Status::Pending.can_advance_to(Status::Running));
        assert!(Status::Pending.can_advance_to(Status::Failed));
        assert!(Status::Running.can_advance_to(Status::Exited));
        assert!(!Status::Running.can_advance_to(Status::Pending));
        assert!(!Status::Running.can_advance_to(Status::Running));
    }
}
