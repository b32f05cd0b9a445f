// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `qk`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "qk",
    version,
    about = "Run a command concurrently in every project below the current directory.",
    long_about = None
)]
pub struct CliArgs {
    /// Number of directory levels to search for projects (-1 = unlimited).
    #[arg(long, global = true, value_name = "N", allow_negative_numbers = true)]
    pub depth: Option<i64>,

    /// Path to the config file (TOML).
    ///
    /// Default: `~/.qk.toml` if it exists, built-in defaults otherwise.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `QK_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Treat commands stopped by a quit request as failures.
    #[arg(long, global = true)]
    pub exited_fails: bool,

    /// Show live command output from the start.
    #[arg(long, global = true)]
    pub show_stdout: bool,

    /// Hide the elapsed-time stopwatch.
    #[arg(long, global = true)]
    pub no_timer: bool,

    /// Hide per-command status lines while running.
    #[arg(long, global = true)]
    pub no_scripts: bool,

    /// Print status changes line by line instead of redrawing the screen.
    #[arg(long, global = true)]
    pub plain: bool,

    #[command(subcommand)]
    pub command: QkCommand,
}

/// What to run in every project.
#[derive(Debug, Clone, Subcommand)]
pub enum QkCommand {
    /// Run `yarn build:prod` across all projects.
    #[command(visible_alias = "b")]
    Build,

    /// Run `yarn` and `composer install` across all projects.
    #[command(visible_alias = "i")]
    Install,

    /// Run `yarn start` (or `npm run start` without a yarn.lock) across all projects.
    #[command(visible_alias = "w")]
    Watch,

    /// Run a package.json script in every project that declares it.
    #[command(visible_alias = "r")]
    Run {
        /// Script name as declared under `scripts` in package.json.
        script: String,
    },

    /// Run a custom command across all projects.
    #[command(visible_alias = "c")]
    Cmd {
        /// Program followed by its arguments.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "CMD")]
        args: Vec<String>,
    },

    /// Run a yarn command across all projects.
    #[command(visible_alias = "y")]
    Yarn {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run an npm command across all projects.
    #[command(visible_alias = "n")]
    Npm {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a composer command across all projects.
    Composer {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List all projects that would be targeted.
    #[command(visible_alias = "l")]
    Ls,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
