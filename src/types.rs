use serde::Deserialize;

/// How units stopped by the engine's own cancellation count towards the
/// overall result of a run.
///
/// - `Ignore`: `Exited` units do not affect success; only `Failed` units do
///   (default).
/// - `Fail`: any `Exited` unit makes the run unsuccessful, so that a run the
///   user interrupted never reports a clean exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitedPolicy {
    Ignore,
    Fail,
}

impl Default for ExitedPolicy {
    fn default() -> Self {
        ExitedPolicy::Ignore
    }
}

/// Which output stream a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}
