// src/view/mod.rs

//! Presentation layer.
//!
//! Everything here reads the registry; nothing here mutates it. The runtime
//! calls a [`Presenter`] after every event, and the presenter decides how
//! (and how often) to draw.
//!
//! - [`render`] is the pure formatter shared by both presenters.
//! - [`terminal`] redraws a live block in place on a TTY.
//! - [`plain`] prints one line per status change, for pipes and CI logs.
//! - [`input`] turns key presses into `RunEvent`s.

pub mod input;
pub mod plain;
pub mod render;
pub mod terminal;

use std::time::Duration;

use crate::config::DisplaySection;
use crate::engine::{RunSummary, ViewToggle};
use crate::errors::Result;
use crate::registry::Registry;

pub use input::InputReader;
pub use plain::PlainPresenter;
pub use render::{format_elapsed, render_run, strip_ansi};
pub use terminal::TerminalPresenter;

/// Display flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub show_timer: bool,
    pub show_scripts: bool,
    pub show_stdout: bool,
    pub show_help: bool,
}

impl ViewState {
    pub fn from_display(display: &DisplaySection) -> Self {
        Self {
            show_timer: display.show_timer,
            show_scripts: display.show_scripts,
            show_stdout: display.show_stdout,
            show_help: false,
        }
    }

    pub fn toggle(&mut self, toggle: ViewToggle) {
        let flag = match toggle {
            ViewToggle::Scripts => &mut self.show_scripts,
            ViewToggle::Timer => &mut self.show_timer,
            ViewToggle::Stdout => &mut self.show_stdout,
            ViewToggle::Help => &mut self.show_help,
        };
        *flag = !*flag;
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::from_display(&DisplaySection::default())
    }
}

/// Sink for registry snapshots.
pub trait Presenter: Send {
    /// Registry changed (or a tick elapsed).
    fn render(&mut self, registry: &Registry, elapsed: Duration) -> Result<()>;

    fn toggle(&mut self, toggle: ViewToggle);

    /// Called exactly once, after the last `render`.
    fn finish(
        &mut self,
        registry: &Registry,
        summary: &RunSummary,
        elapsed: Duration,
    ) -> Result<()>;
}
