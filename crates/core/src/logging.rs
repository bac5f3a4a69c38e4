//! Logging initialization and configuration.

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{Error, Result};

/// Default filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,gimbal=debug,gimbal_scene=debug";

/// Initialize the logging system with tracing.
///
/// If a global subscriber is already installed it is kept, and the failure is
/// reported through that subscriber at `debug` level.
///
/// This sets up tracing-subscriber with:
/// - Environment-based filtering (RUST_LOG), falling back to [`DEFAULT_FILTER`]
/// - Target names so scene and app events can be told apart
///
/// # Example
/// ```
/// gimbal_core::init_logging();
/// tracing::info!("Scene initialized");
/// ```
pub fn init_logging() {
    if let Err(e) = try_init_logging() {
        debug!("Keeping existing subscriber: {}", e);
    }
}

/// Same as [`init_logging`], but reports a failure to install the subscriber.
pub fn try_init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        let _ = try_init_logging();
        assert!(matches!(try_init_logging(), Err(Error::Logging(_))));

        // The infallible variant keeps the installed subscriber
        init_logging();
        tracing::info!("still logging");
    }
}
