// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod types;
pub mod view;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::style::Stylize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, QkCommand};
use crate::config::{load_or_default, ConfigFile};
use crate::discovery::{discover_projects, DiscoveredProject, DiscoveryOptions};
use crate::engine::{CoreRuntime, RunEvent, RunOptions, Runtime};
use crate::errors::{QkError, Result};
use crate::exec::{RealExecutorBackend, RunnerOptions};
use crate::fs::{FileSystem, RealFileSystem};
use crate::registry::Registry;
use crate::types::ExitedPolicy;
use crate::view::{InputReader, PlainPresenter, TerminalPresenter, ViewState};

/// Spinner and stopwatch refresh rate of the live view.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// High-level entry point used by `main.rs`. Returns whether the run
/// succeeded.
///
/// This wires together:
/// - config loading and CLI overrides
/// - project discovery
/// - registry / core / runtime
/// - executor
/// - presenter, key input and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<bool> {
    let mut cfg = load_or_default(args.config.as_deref().map(Path::new))?;
    apply_overrides(&mut cfg, &args)?;

    let root = std::env::current_dir()?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let projects = discover_projects(fs.as_ref(), &root, &DiscoveryOptions::from_config(&cfg.run))?;
    if projects.is_empty() {
        return Err(QkError::NoProjects(root.display().to_string()));
    }
    info!(count = projects.len(), root = %root.display(), "discovered projects");

    if matches!(args.command, QkCommand::Ls) {
        print_projects(&projects);
        return Ok(true);
    }

    let mut registry = Registry::from_discovered(projects, cfg.run.output_lines);
    commands::register(&mut registry, &args.command, fs)?;
    if registry.unit_count() == 0 {
        warn!(command = ?args.command, "no project matched the command; nothing to run");
    }

    let interactive =
        !args.plain && std::io::stdout().is_terminal() && std::io::stdin().is_terminal();

    let options = RunOptions {
        exited_policy: cfg.run.exited_policy,
        grace_period: cfg.run.grace_period(),
        shutdown_timeout: cfg.run.shutdown_timeout(),
        tick_interval: interactive.then_some(TICK_INTERVAL),
    };
    let state = ViewState::from_display(&cfg.display);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RunEvent>(256);

    let executor =
        RealExecutorBackend::new(rt_tx.clone(), RunnerOptions::new(options.grace_period));

    // Ctrl-C → cancel every unit. In the live view the terminal is in raw
    // mode and Ctrl-C arrives as a key instead.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RunEvent::CancelRequested).await;
        });
    }

    let core = CoreRuntime::new(registry, options);

    let summary = if interactive {
        let input = InputReader::start(rt_tx.clone());
        let presenter = TerminalPresenter::new(state)?;
        drop(rt_tx);
        let result = Runtime::new(core, rt_rx, executor, presenter).run().await;
        input.stop();
        result?
    } else {
        drop(rt_tx);
        let presenter = PlainPresenter::stdout(state);
        Runtime::new(core, rt_rx, executor, presenter).run().await?
    };

    debug!(?summary, "run finished");
    Ok(summary.success)
}

/// Fold command-line flags into the loaded configuration.
fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) -> Result<()> {
    if let Some(depth) = args.depth {
        if depth < -1 {
            return Err(QkError::ConfigError(format!(
                "--depth must be -1 (unlimited) or greater, got {depth}"
            )));
        }
        cfg.run.depth = depth;
    }
    if args.exited_fails {
        cfg.run.exited_policy = ExitedPolicy::Fail;
    }
    if args.show_stdout {
        cfg.display.show_stdout = true;
    }
    if args.no_timer {
        cfg.display.show_timer = false;
    }
    if args.no_scripts {
        cfg.display.show_scripts = false;
    }
    Ok(())
}

fn print_projects(projects: &[DiscoveredProject]) {
    println!("{}", "Targets".bold().magenta());
    for project in projects {
        println!("  {}  {}", project.name, project.dir.display().to_string().dark_grey());
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let args = CliArgs::try_parse_from([
            "qk",
            "--depth",
            "-1",
            "--exited-fails",
            "--show-stdout",
            "--no-timer",
            "build",
        ])
        .unwrap();
        let mut cfg = ConfigFile::default();
        apply_overrides(&mut cfg, &args).unwrap();

        assert_eq!(cfg.run.max_depth(), None);
        assert_eq!(cfg.run.exited_policy, ExitedPolicy::Fail);
        assert!(cfg.display.show_stdout);
        assert!(!cfg.display.show_timer);
        assert!(cfg.display.show_scripts);
    }

    #[test]
    fn depth_below_unlimited_is_rejected() {
        let args = CliArgs::try_parse_from(["qk", "--depth", "-2", "build"]).unwrap();
        let mut cfg = ConfigFile::default();
        assert!(matches!(
            apply_overrides(&mut cfg, &args),
            Err(QkError::ConfigError(_))
        ));
    }
}
