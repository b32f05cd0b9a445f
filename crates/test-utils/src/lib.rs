//! Shared helpers for qk's integration tests: scripted executors, a recording
//! presenter, registry builders, and the two functions below.

pub mod builders;
pub mod fake_executor;
pub mod presenter;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use qk::logging::LOG_ENV;
use tracing_subscriber::{fmt, EnvFilter};

/// How long [`with_timeout`] lets a test future run.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// The filter is read from `QK_LOG`, the same variable the binary uses, and
/// defaults to `info`. Output goes through the test writer, so the harness
/// only shows it for failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = std::env::var(LOG_ENV)
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        // Another harness may have installed a subscriber first; keep theirs.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`DEFAULT_TEST_TIMEOUT`].
pub async fn with_timeout<F: Future>(f: F) -> F::Output {
    with_timeout_of(DEFAULT_TEST_TIMEOUT, f).await
}

/// Await `f`, panicking if it takes longer than `limit`.
pub async fn with_timeout_of<F: Future>(limit: Duration, f: F) -> F::Output {
    match tokio::time::timeout(limit, f).await {
        Ok(output) => output,
        Err(_) => panic!("test did not finish within {limit:?}"),
    }
}
