// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the command units, using
//! `tokio::process::Command`, and reporting back to the orchestration
//! runtime via `RunEvent`s.
//!
//! - [`runner`] runs one unit's process and pumps its output.
//! - [`cancel`] holds the per-unit cancellation tokens.
//! - [`terminate`] implements the graceful-then-forced termination sequence.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod cancel;
pub mod runner;
pub mod terminate;

pub use backend::{BackendFuture, ExecutorBackend, RealExecutorBackend};
pub use cancel::{CancelHandle, CancelSignal};
pub use runner::{run_unit, RunnerOptions};
pub use terminate::{platform_terminator, terminate, ChildTerminator, Terminator};
#[cfg(unix)]
pub use terminate::ProcessGroupTerminator;
