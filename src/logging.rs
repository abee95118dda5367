//! Log output for hosts embedding the provider.
//!
//! Everything goes to **stderr**: stdout belongs to the plugin host. Filtering
//! follows `RUST_LOG`, for example:
//!
//! ```bash
//! RUST_LOG=octopus_provider_core=debug ./terraform-provider-octopusdeploy
//! RUST_LOG=warn,octopus_provider_core::guard=trace ./terraform-provider-octopusdeploy
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level used when `RUST_LOG` is unset.
pub const DEFAULT_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber at [`DEFAULT_LEVEL`].
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Install the global subscriber, using `default_level` when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Like [`init_logging`], but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LEVEL))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}
