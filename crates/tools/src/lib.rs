//! Emporium Tools
//!
//! CLI tools for generating and validating emporium datasets.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info` for emporium crates and `warn` for others.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,emporium_tools=info,emporium_engine=info,emporium_dimensions=info,emporium_output=info")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
