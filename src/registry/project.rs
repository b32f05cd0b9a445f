use std::path::{Path, PathBuf};

use crate::registry::status::Status;
use crate::registry::unit::CommandUnit;

/// A discovered project directory and the commands registered against it.
#[derive(Debug)]
pub struct Project {
    name: String,
    dir: PathBuf,
    units: Vec<CommandUnit>,
}

impl Project {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            units: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn units(&self) -> &[CommandUnit] {
        &self.units
    }

    pub(crate) fn units_mut(&mut self) -> &mut [CommandUnit] {
        &mut self.units
    }

    pub(crate) fn push_unit(&mut self, unit: CommandUnit) {
        self.units.push(unit);
    }

    /// True for a project without units.
    pub fn all_terminal(&self) -> bool {
        self.units.iter().all(|u| u.status().is_terminal())
    }

    pub fn any_failed(&self) -> bool {
        self.units.iter().any(|u| u.status() == Status::Failed)
    }

    pub fn all_finished(&self) -> bool {
        self.units.iter().all(|u| u.status() == Status::Finished)
    }
}
