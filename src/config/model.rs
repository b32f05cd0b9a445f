// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::ExitedPolicy;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [display]
/// show_timer = true
/// show_scripts = true
/// show_stdout = false
///
/// [run]
/// output_lines = 50
/// grace_period_ms = 100
/// exited_policy = "ignore"
/// depth = 3
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub display: DisplaySection,

    #[serde(default)]
    pub run: RunSection,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub display: DisplaySection,
    pub run: RunSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(display: DisplaySection, run: RunSection) -> Self {
        Self { display, run }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(DisplaySection::default(), RunSection::default())
    }
}

/// `[display]` section: initial state of the view toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_true")]
    pub show_timer: bool,

    #[serde(default = "default_true")]
    pub show_scripts: bool,

    #[serde(default)]
    pub show_stdout: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            show_timer: true,
            show_scripts: true,
            show_stdout: false,
        }
    }
}

/// `[run]` section: engine and discovery tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Lines of output retained per command.
    #[serde(default = "default_output_lines")]
    pub output_lines: usize,

    /// Delay between the graceful and the forced termination signal.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Extra time granted after the grace period before still-running
    /// commands are given up on during shutdown.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    #[serde(default)]
    pub exited_policy: ExitedPolicy,

    /// Discovery depth; `-1` means unlimited.
    #[serde(default = "default_depth")]
    pub depth: i64,

    /// Files that must all be present for a directory to count as a project.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    /// Directory names never descended into.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

impl RunSection {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// `None` when discovery depth is unlimited.
    pub fn max_depth(&self) -> Option<usize> {
        usize::try_from(self.depth).ok()
    }
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            output_lines: default_output_lines(),
            grace_period_ms: default_grace_period_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            exited_policy: ExitedPolicy::default(),
            depth: default_depth(),
            markers: default_markers(),
            ignore: default_ignore(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_lines() -> usize {
    50
}

fn default_grace_period_ms() -> u64 {
    100
}

fn default_shutdown_timeout_ms() -> u64 {
    2000
}

fn default_depth() -> i64 {
    3
}

fn default_markers() -> Vec<String> {
    vec!["composer.json".to_string(), "package.json".to_string()]
}

fn default_ignore() -> Vec<String> {
    ["node_modules", ".git", ".idea", "vendor"]
        .into_iter()
        .map(String::from)
        .collect()
}
