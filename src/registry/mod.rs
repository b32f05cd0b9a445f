// src/registry/mod.rs

//! In-memory model of a run: projects, their command units, and the status
//! of every unit.
//!
//! - [`project`] holds a project and its ordered units.
//! - [`unit`] holds a single command unit, its bounded output buffer and its
//!   cancellation handle.
//! - [`status`] defines the unit lifecycle.
//! - [`predicate`] provides project predicates for conditional registration.
//!
//! The registry is mutated only by the engine's core; everything else reads
//! it. Aggregates are recomputed on every call (O(units)).

pub mod predicate;
pub mod project;
pub mod status;
pub mod unit;

pub use predicate::Predicate;
pub use project::Project;
pub use status::{Status, StatusCounts};
pub use unit::{CommandUnit, OutputBuffer, RenderFn, UnitId, UnitLaunch};

use tracing::debug;

use crate::discovery::DiscoveredProject;

/// All projects of a run and the units registered against them.
#[derive(Debug)]
pub struct Registry {
    projects: Vec<Project>,
    line_cap: usize,
}

impl Registry {
    /// `line_cap` is the per-unit output buffer size.
    pub fn new(projects: Vec<Project>, line_cap: usize) -> Self {
        Self { projects, line_cap }
    }

    pub fn from_discovered(projects: Vec<DiscoveredProject>, line_cap: usize) -> Self {
        let projects = projects
            .into_iter()
            .map(|p| Project::new(p.name, p.dir))
            .collect();
        Self::new(projects, line_cap)
    }

    /// Register `program args..` against every project.
    pub fn add_command(&mut self, render: RenderFn, program: &str, args: &[&str]) -> &mut Self {
        self.add_optional_command(&|_: &Project| true, render, program, args)
    }

    /// Register `program args..` against every project for which `predicate`
    /// holds.
    pub fn add_optional_command(
        &mut self,
        predicate: &dyn Fn(&Project) -> bool,
        render: RenderFn,
        program: &str,
        args: &[&str],
    ) -> &mut Self {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        for project in &mut self.projects {
            if !predicate(project) {
                debug!(project = %project.name(), program, "predicate rejected project; skipping");
                continue;
            }
            project.push_unit(CommandUnit::new(
                program.to_string(),
                args.clone(),
                render.clone(),
                self.line_cap,
            ));
        }
        self
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, index: usize) -> Option<&Project> {
        self.projects.get(index)
    }

    pub fn unit(&self, id: UnitId) -> Option<&CommandUnit> {
        self.projects.get(id.project)?.units().get(id.unit)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut CommandUnit> {
        self.projects.get_mut(id.project)?.units_mut().get_mut(id.unit)
    }

    /// Every unit id in project order, then registration order.
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.projects
            .iter()
            .enumerate()
            .flat_map(|(p, project)| (0..project.units().len()).map(move |u| UnitId::new(p, u)))
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.projects.iter().map(|p| p.units().len()).sum()
    }

    fn statuses(&self) -> impl Iterator<Item = Status> + '_ {
        self.projects
            .iter()
            .flat_map(|p| p.units().iter().map(CommandUnit::status))
    }

    /// No unit is Pending or Running.
    pub fn all_terminal(&self) -> bool {
        self.statuses().all(Status::is_terminal)
    }

    pub fn any_failed(&self) -> bool {
        self.statuses().any(|s| s == Status::Failed)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for status in self.statuses() {
            counts.record(status);
        }
        counts
    }

    /// Fire every unit's cancellation token.
    pub fn cancel_all(&self) {
        for project in &self.projects {
            for unit in project.units() {
                unit.cancel_handle().cancel();
            }
        }
    }

    /// Fire one unit's cancellation token. Returns `false` for an unknown id.
    pub fn cancel_unit(&self, id: UnitId) -> bool {
        match self.unit(id) {
            Some(unit) => {
                unit.cancel_handle().cancel();
                true
            }
            None => false,
        }
    }

    /// Launch descriptions for every unit, in `unit_ids` order.
    pub fn launches(&self) -> Vec<UnitLaunch> {
        self.unit_ids()
            .into_iter()
            .filter_map(|id| {
                let project = self.project(id.project)?;
                let unit = project.units().get(id.unit)?;
                Some(UnitLaunch {
                    id,
                    project: project.name().to_string(),
                    program: unit.program().to_string(),
                    args: unit.args().to_vec(),
                    dir: project.dir().to_path_buf(),
                    cancel: unit.cancel_handle().signal(),
                })
            })
            .collect()
    }
}
