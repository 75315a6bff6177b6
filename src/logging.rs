//! Logging infrastructure for bramble.
//!
//! The library itself only *emits* `tracing` events (see
//! [`Vine::logged`](crate::vine::Vine::logged)); installing a subscriber is
//! the host's job. This module provides a console subscriber for binaries,
//! examples, and tests that don't bring their own.
//!
//! ```no_run
//! bramble::logging::init().expect("Failed to initialize logging");
//! tracing::info!("collections ready");
//! ```

use anyhow::{Context as _, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Initializes a console `tracing` subscriber.
///
/// Defaults to `info`, overridable with `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or the
/// filter cannot be built.
pub fn init() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_safe_to_retry() {
        // First call installs, later calls report the existing subscriber.
        let first = init();
        let second = init();
        assert!(first.is_ok() || second.is_err());
    }
}
