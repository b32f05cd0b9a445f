// src/commands.rs

//! Subcommand → command units.

use std::sync::Arc;

use crossterm::style::{Color, Stylize};
use tracing::debug;

use crate::cli::QkCommand;
use crate::errors::{QkError, Result};
use crate::fs::FileSystem;
use crate::registry::predicate::{and, has_file, has_script, not};
use crate::registry::{RenderFn, Registry, Status};

const YARN_LOCK: &str = "yarn.lock";

const LABEL: Color = Color::Rgb {
    r: 0xdc,
    g: 0x8a,
    b: 0x78,
};

/// Render callback showing `label` and, on request, the unit's status in
/// the status colour.
pub fn render_command(label: impl Into<String>) -> RenderFn {
    let label = label.into();
    Arc::new(move |status, show_status| {
        let name = label.as_str().with(LABEL);
        if !show_status {
            return name.to_string();
        }
        let status_text = match status {
            Status::Finished => status.as_str().green().to_string(),
            Status::Failed => status.as_str().red().to_string(),
            Status::Exited => status.as_str().yellow().to_string(),
            Status::Pending | Status::Running => status.as_str().to_string(),
        };
        format!("{name} {status_text}")
    })
}

/// Register the units `command` runs in every project.
///
/// `ls` registers nothing. Commands that need arguments fail with
/// `QkError::InvalidCommand` when none are given.
pub fn register(
    registry: &mut Registry,
    command: &QkCommand,
    fs: Arc<dyn FileSystem>,
) -> Result<()> {
    match command {
        QkCommand::Build => {
            registry.add_command(render_command("yarn"), "yarn", &["build:prod"]);
        }
        QkCommand::Install => {
            registry
                .add_command(render_command("yarn"), "yarn", &[])
                .add_command(render_command("composer"), "composer", &["install"]);
        }
        QkCommand::Watch => {
            let has_yarn = has_file(fs.clone(), YARN_LOCK);
            let no_yarn = not(has_file(fs, YARN_LOCK));
            registry
                .add_optional_command(&*has_yarn, render_command("yarn"), "yarn", &["start"])
                .add_optional_command(&*no_yarn, render_command("npm"), "npm", &["run", "start"]);
        }
        QkCommand::Run { script } => {
            let with_yarn = and(vec![
                has_script(fs.clone(), script.as_str()),
                has_file(fs.clone(), YARN_LOCK),
            ]);
            let with_npm = and(vec![
                has_script(fs.clone(), script.as_str()),
                not(has_file(fs, YARN_LOCK)),
            ]);
            registry
                .add_optional_command(
                    &*with_yarn,
                    render_command(script.as_str()),
                    "yarn",
                    &[script.as_str()],
                )
                .add_optional_command(
                    &*with_npm,
                    render_command(script.as_str()),
                    "npm",
                    &["run", script.as_str()],
                );
        }
        QkCommand::Cmd { args } => {
            let (program, rest) = split_program(args, "cmd")?;
            registry.add_command(render_command(program), program, &rest);
        }
        QkCommand::Yarn { args } => add_tool(registry, "yarn", args)?,
        QkCommand::Npm { args } => add_tool(registry, "npm", args)?,
        QkCommand::Composer { args } => add_tool(registry, "composer", args)?,
        QkCommand::Ls => {}
    }

    debug!(units = registry.unit_count(), ?command, "registered command units");
    Ok(())
}

fn add_tool(registry: &mut Registry, tool: &str, args: &[String]) -> Result<()> {
    if args.is_empty() {
        return Err(QkError::InvalidCommand(format!(
            "`{tool}` needs at least one argument, e.g. `qk {tool} install`"
        )));
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    registry.add_command(render_command(tool), tool, &args);
    Ok(())
}

fn split_program<'a>(args: &'a [String], subcommand: &str) -> Result<(&'a str, Vec<&'a str>)> {
    match args.split_first() {
        Some((program, rest)) => Ok((program.as_str(), rest.iter().map(String::as_str).collect())),
        None => Err(QkError::InvalidCommand(format!(
            "`{subcommand}` needs a program to run, e.g. `qk {subcommand} git status`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::registry::{Project, UnitId};
    use crate::view::strip_ansi;

    fn setup() -> (Registry, Arc<dyn FileSystem>) {
        let fs = MockFileSystem::new();
        fs.add_file("/w/yarn-app/package.json", r#"{"scripts":{"lint":"eslint ."}}"#);
        fs.add_file("/w/yarn-app/yarn.lock", "");
        fs.add_file("/w/npm-app/package.json", r#"{"scripts":{"test":"jest"}}"#);
        let registry = Registry::new(
            vec![
                Project::new("yarn-app", "/w/yarn-app"),
                Project::new("npm-app", "/w/npm-app"),
            ],
            10,
        );
        (registry, Arc::new(fs))
    }

    fn command_lines(registry: &Registry, project: usize) -> Vec<String> {
        registry
            .project(project)
            .unwrap()
            .units()
            .iter()
            .map(|u| u.command_line())
            .collect()
    }

    #[test]
    fn watch_picks_package_manager_per_project() {
        let (mut reg, fs) = setup();
        register(&mut reg, &QkCommand::Watch, fs).unwrap();
        assert_eq!(command_lines(&reg, 0), vec!["yarn start"]);
        assert_eq!(command_lines(&reg, 1), vec!["npm run start"]);
    }

    #[test]
    fn install_registers_two_units_everywhere() {
        let (mut reg, fs) = setup();
        register(&mut reg, &QkCommand::Install, fs).unwrap();
        assert_eq!(command_lines(&reg, 1), vec!["yarn", "composer install"]);
        assert_eq!(reg.unit_count(), 4);
    }

    #[test]
    fn run_only_targets_projects_declaring_the_script() {
        let (mut reg, fs) = setup();
        register(&mut reg, &QkCommand::Run { script: "test".into() }, fs).unwrap();
        assert!(command_lines(&reg, 0).is_empty());
        assert_eq!(command_lines(&reg, 1), vec!["npm run test"]);
    }

    #[test]
    fn custom_command_splits_program_and_args() {
        let (mut reg, fs) = setup();
        let cmd = QkCommand::Cmd {
            args: vec!["git".into(), "status".into(), "-s".into()],
        };
        register(&mut reg, &cmd, fs).unwrap();
        assert_eq!(command_lines(&reg, 0), vec!["git status -s"]);
    }

    #[test]
    fn tool_commands_require_arguments() {
        let (mut reg, fs) = setup();
        for cmd in [
            QkCommand::Cmd { args: vec![] },
            QkCommand::Yarn { args: vec![] },
            QkCommand::Npm { args: vec![] },
            QkCommand::Composer { args: vec![] },
        ] {
            let err = register(&mut reg, &cmd, fs.clone()).unwrap_err();
            assert!(matches!(err, QkError::InvalidCommand(_)));
        }
        assert_eq!(reg.unit_count(), 0);
    }

    #[test]
    fn render_command_shows_label_and_optional_status() {
        let render = render_command("yarn");
        assert_eq!(strip_ansi(&render(Status::Failed, true)), "yarn failed");
        assert_eq!(strip_ansi(&render(Status::Running, false)), "yarn");

        let (mut reg, fs) = setup();
        register(&mut reg, &QkCommand::Build, fs).unwrap();
        assert_eq!(
            strip_ansi(&reg.unit(UnitId::new(0, 0)).unwrap().render(true)),
            "yarn pending"
        );
    }
}
