#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use qk::engine::{CoreRuntime, RunOptions};
use qk::registry::{Project, RenderFn, Registry};
use qk::types::ExitedPolicy;

/// Render callback that prints `program status` without colours.
pub fn plain_render(label: &str) -> RenderFn {
    let label = label.to_string();
    Arc::new(move |status, show| {
        if show {
            format!("{label} {status}")
        } else {
            label.clone()
        }
    })
}

/// Builder for `Registry` to simplify test setup.
///
/// Projects live under `/work/<name>` unless a directory is given.
pub struct RegistryBuilder {
    projects: Vec<Project>,
    commands: Vec<(String, Vec<String>)>,
    line_cap: usize,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            commands: Vec::new(),
            line_cap: 50,
        }
    }

    pub fn project(mut self, name: &str) -> Self {
        self.projects
            .push(Project::new(name, PathBuf::from("/work").join(name)));
        self
    }

    pub fn project_in(mut self, name: &str, dir: impl Into<PathBuf>) -> Self {
        self.projects.push(Project::new(name, dir));
        self
    }

    /// `n` projects named `p0..pn`.
    pub fn projects(mut self, n: usize) -> Self {
        for i in 0..n {
            self = self.project(&format!("p{i}"));
        }
        self
    }

    /// Register `program args..` against every project.
    pub fn command(mut self, program: &str, args: &[&str]) -> Self {
        self.commands.push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        self
    }

    pub fn line_cap(mut self, cap: usize) -> Self {
        self.line_cap = cap;
        self
    }

    pub fn build(self) -> Registry {
        let mut registry = Registry::new(self.projects, self.line_cap);
        for (program, args) in &self.commands {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            registry.add_command(plain_render(program), program, &args);
        }
        registry
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Options with short timings suitable for tests.
pub fn fast_options(policy: ExitedPolicy) -> RunOptions {
    RunOptions {
        exited_policy: policy,
        grace_period: Duration::from_millis(50),
        shutdown_timeout: Duration::from_millis(300),
        tick_interval: None,
    }
}

/// A core over `registry` with [`fast_options`].
pub fn core_for(registry: Registry, policy: ExitedPolicy) -> CoreRuntime {
    CoreRuntime::new(registry, fast_options(policy))
}
