// src/registry/unit.rs

//! A single command bound to a single project.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::exec::cancel::{CancelHandle, CancelSignal};
use crate::registry::status::Status;

/// Maps a unit's status to display text. The `bool` asks for the status to be
/// included (`true`) or just the label (`false`).
///
/// Supplied by whoever registers the command; the engine never looks at the
/// returned string.
pub type RenderFn = Arc<dyn Fn(Status, bool) -> String + Send + Sync>;

/// Address of a unit: index of its project, index within that project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId {
    pub project: usize,
    pub unit: usize,
}

impl UnitId {
    pub fn new(project: usize, unit: usize) -> Self {
        Self { project, unit }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project, self.unit)
    }
}

/// Most-recent-N lines of a unit's combined stdout/stderr.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    cap: usize,
    dropped: usize,
}

impl OutputBuffer {
    /// `cap` is clamped to at least 1.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            lines: VecDeque::with_capacity(cap.min(64)),
            cap,
            dropped: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
            self.dropped += 1;
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Lines evicted so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator {
        self.lines.iter().map(String::as_str)
    }

    /// The last `n` lines, oldest first. `n == 0` means all retained lines.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &str> {
        let skip = if n == 0 {
            0
        } else {
            self.lines.len().saturating_sub(n)
        };
        self.lines.iter().skip(skip).map(String::as_str)
    }
}

/// One (program, args) pair registered against a project.
pub struct CommandUnit {
    program: String,
    args: Vec<String>,
    status: Status,
    /// Why the unit failed, when it did.
    detail: Option<String>,
    output: OutputBuffer,
    cancel: CancelHandle,
    render: RenderFn,
}

impl fmt::Debug for CommandUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandUnit")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("status", &self.status)
            .field("detail", &self.detail)
            .field("output_lines", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl CommandUnit {
    pub fn new(program: String, args: Vec<String>, render: RenderFn, line_cap: usize) -> Self {
        Self {
            program,
            args,
            status: Status::Pending,
            detail: None,
            output: OutputBuffer::new(line_cap),
            cancel: CancelHandle::new(),
            render,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// `program arg1 arg2`, for logs and the plain view.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    pub fn render(&self, show_status: bool) -> String {
        (self.render)(self.status, show_status)
    }

    /// Move the unit forward in its lifecycle.
    ///
    /// Returns `false` (and leaves the unit untouched) when `next` would not
    /// move it strictly forward.
    pub fn advance(&mut self, next: Status, detail: Option<String>) -> bool {
        if !self.status.can_advance_to(next) {
            warn!(
                program = %self.program,
                from = %self.status,
                to = %next,
                "ignoring non-monotonic status transition"
            );
            return false;
        }
        self.status = next;
        if detail.is_some() {
            self.detail = detail;
        }
        true
    }

    pub(crate) fn push_output(&mut self, line: String) {
        self.output.push(line);
    }
}

/// Everything a process runner needs to start one unit.
#[derive(Debug, Clone)]
pub struct UnitLaunch {
    pub id: UnitId,
    pub project: String,
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub cancel: CancelSignal,
}
