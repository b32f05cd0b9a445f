// src/logging.rs

//! Diagnostic logging for `qk`.
//!
//! The filter comes from `--log-level` when given, otherwise from `QK_LOG`,
//! which takes full `EnvFilter` directives (`debug`, `qk::exec=trace,warn`).
//! Without either, only warnings and errors are shown: the live view redraws
//! stdout in place and unit lifecycle events are logged at `info`.
//!
//! Everything is written to stderr.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "QK_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(cli_level, env.as_deref());

    fmt()
        .with_env_filter(EnvFilter::new(&directives))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

/// Pick the filter directives. An unparsable `QK_LOG` falls back to the
/// default rather than silencing everything.
fn filter_directives(cli_level: Option<LogLevel>, env: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level_name(level).to_string();
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) if EnvFilter::try_new(directives).is_ok() => directives.to_string(),
        Some(directives) => {
            eprintln!("qk: ignoring invalid {LOG_ENV}={directives:?}");
            DEFAULT_DIRECTIVES.to_string()
        }
        None => DEFAULT_DIRECTIVES.to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_environment() {
        assert_eq!(filter_directives(Some(LogLevel::Debug), Some("error")), "debug");
    }

    #[test]
    fn environment_directives_pass_through() {
        assert_eq!(filter_directives(None, Some(" qk::exec=trace,info ")), "qk::exec=trace,info");
        assert_eq!(filter_directives(None, Some("trace")), "trace");
    }

    #[test]
    fn defaults_to_warn() {
        assert_eq!(filter_directives(None, None), "warn");
        assert_eq!(filter_directives(None, Some("  ")), "warn");
        assert_eq!(filter_directives(None, Some("qk=loud")), "warn");
    }
}
