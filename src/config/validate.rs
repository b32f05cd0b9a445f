use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{QkError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::QkError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.display, raw.run))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_run_section(cfg)?;
    validate_discovery(cfg)?;
    Ok(())
}

fn validate_run_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.output_lines == 0 {
        return Err(QkError::ConfigError(
            "[run].output_lines must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.run.grace_period_ms == 0 {
        return Err(QkError::ConfigError(
            "[run].grace_period_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_discovery(cfg: &RawConfigFile) -> Result<()> {
    if cfg.run.depth < -1 {
        return Err(QkError::ConfigError(format!(
            "[run].depth must be -1 (unlimited) or >= 0 (got {})",
            cfg.run.depth
        )));
    }

    if cfg.run.markers.is_empty() {
        return Err(QkError::ConfigError(
            "[run].markers must name at least one file".to_string(),
        ));
    }

    Ok(())
}
