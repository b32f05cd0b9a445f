// src/view/plain.rs

//! Line-oriented view for pipes, CI logs and `--plain`.

use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::engine::{RunSummary, ViewToggle};
use crate::errors::Result;
use crate::registry::{Registry, Status, UnitId};

use super::render::{describe_unit, render_run, strip_ansi};
use super::{Presenter, ViewState};

#[derive(Debug, Clone, Copy)]
struct Seen {
    status: Status,
    /// Lines ever pushed to the unit's buffer, including evicted ones.
    lines: usize,
}

/// Prints each status change once, plus new output lines when stdout is
/// shown, and a colourless final report.
pub struct PlainPresenter<W: Write + Send = Stdout> {
    out: W,
    state: ViewState,
    seen: HashMap<UnitId, Seen>,
}

impl PlainPresenter<Stdout> {
    pub fn stdout(state: ViewState) -> Self {
        Self::new(io::stdout(), state)
    }
}

impl<W: Write + Send> PlainPresenter<W> {
    pub fn new(out: W, state: ViewState) -> Self {
        Self {
            out,
            state,
            seen: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_changes(&mut self, registry: &Registry) -> io::Result<()> {
        for id in registry.unit_ids() {
            let (Some(project), Some(unit)) = (registry.project(id.project), registry.unit(id))
            else {
                continue;
            };
            let prev = self.seen.get(&id).copied().unwrap_or(Seen {
                status: Status::Pending,
                lines: 0,
            });

            let total = unit.output().dropped() + unit.output().len();
            if self.state.show_stdout && total > prev.lines {
                let fresh = (total - prev.lines).min(unit.output().len());
                let skip = unit.output().len() - fresh;
                for line in unit.output().lines().skip(skip) {
                    writeln!(self.out, "[{}] {}", project.name(), strip_ansi(line))?;
                }
            }

            if unit.status() != prev.status {
                writeln!(
                    self.out,
                    "{}",
                    describe_unit(project, &unit.command_line(), unit.status(), unit.detail())
                )?;
            }

            self.seen.insert(
                id,
                Seen {
                    status: unit.status(),
                    lines: total,
                },
            );
        }
        self.out.flush()
    }
}

impl<W: Write + Send> Presenter for PlainPresenter<W> {
    fn render(&mut self, registry: &Registry, _elapsed: Duration) -> Result<()> {
        self.write_changes(registry)?;
        Ok(())
    }

    fn toggle(&mut self, toggle: ViewToggle) {
        self.state.toggle(toggle);
    }

    fn finish(
        &mut self,
        registry: &Registry,
        _summary: &RunSummary,
        elapsed: Duration,
    ) -> Result<()> {
        self.write_changes(registry)?;
        let report = strip_ansi(&render_run(registry, &self.state, true, elapsed, 0, 0));
        writeln!(self.out)?;
        writeln!(self.out, "{report}")?;
        self.out.flush()?;
        Ok(())
    }
}
