// src/view/terminal.rs

//! Live in-place view for interactive terminals.

use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use tracing::debug;

use crate::engine::{RunSummary, ViewToggle};
use crate::errors::Result;
use crate::registry::Registry;

use super::render::render_run;
use super::{Presenter, ViewState};

/// Minimum delay between two redraws; bursts of output collapse into one.
const MIN_REDRAW_INTERVAL: Duration = Duration::from_millis(50);

/// Spinner advances once per this interval.
const SPINNER_STEP: Duration = Duration::from_millis(100);

/// Output lines shown per unit while running.
const LIVE_OUTPUT_LINES: usize = 10;

/// Redraws the run as a block of lines below the cursor.
///
/// Puts the terminal in raw mode so single key presses reach the
/// [`InputReader`](super::InputReader); the terminal is restored by `finish`
/// or on drop.
pub struct TerminalPresenter {
    out: Stdout,
    state: ViewState,
    drawn_lines: usize,
    last_draw: Option<Instant>,
    raw: bool,
}

impl TerminalPresenter {
    pub fn new(state: ViewState) -> Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(out, cursor::Hide, terminal::DisableLineWrap)?;

        Ok(Self {
            out,
            state,
            drawn_lines: 0,
            last_draw: None,
            raw: true,
        })
    }

    fn erase(&mut self) -> io::Result<()> {
        if self.drawn_lines > 0 {
            let up = u16::try_from(self.drawn_lines).unwrap_or(u16::MAX);
            queue!(self.out, cursor::MoveToPreviousLine(up))?;
        } else {
            queue!(self.out, cursor::MoveToColumn(0))?;
        }
        queue!(self.out, terminal::Clear(ClearType::FromCursorDown))?;
        self.drawn_lines = 0;
        Ok(())
    }

    fn draw(&mut self, text: &str) -> io::Result<()> {
        self.erase()?;

        let height = terminal::size().map(|(_, h)| usize::from(h)).unwrap_or(24);
        let lines = fit_to_height(text, height);
        for line in &lines {
            // Raw mode: "\n" alone does not return the carriage.
            queue!(self.out, Print(line), Print("\r\n"))?;
        }
        self.drawn_lines = lines.len();
        self.out.flush()
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;
        execute!(self.out, terminal::EnableLineWrap, cursor::Show)?;
        terminal::disable_raw_mode()
    }
}

/// Keep the last `height - 1` lines so the block never scrolls the screen,
/// which would break the in-place redraw.
fn fit_to_height(text: &str, height: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let room = height.saturating_sub(1).max(1);
    let skip = lines.len().saturating_sub(room);
    lines[skip..].to_vec()
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, registry: &Registry, elapsed: Duration) -> Result<()> {
        if self
            .last_draw
            .is_some_and(|at| at.elapsed() < MIN_REDRAW_INTERVAL)
        {
            return Ok(());
        }
        self.last_draw = Some(Instant::now());

        let frame = (elapsed.as_millis() / SPINNER_STEP.as_millis()) as usize;
        let text = render_run(registry, &self.state, false, elapsed, frame, LIVE_OUTPUT_LINES);
        self.draw(&text)?;
        Ok(())
    }

    fn toggle(&mut self, toggle: ViewToggle) {
        self.state.toggle(toggle);
        // Next render is immediate.
        self.last_draw = None;
    }

    fn finish(
        &mut self,
        registry: &Registry,
        _summary: &RunSummary,
        elapsed: Duration,
    ) -> Result<()> {
        self.erase()?;
        self.out.flush()?;
        self.restore()?;

        let text = render_run(registry, &self.state, true, elapsed, 0, 0);
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalPresenter {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            debug!(error = %e, "failed to restore terminal");
        }
    }
}
