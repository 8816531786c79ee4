use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the process-wide `tracing` subscriber.
///
/// `level` seeds the default directive (from `LOG_LEVEL`, spec.md §6);
/// `RUST_LOG`, if set, is layered on top so operators can raise per-module
/// verbosity without a redeploy, the way `tracing_subscriber::EnvFilter`
/// composes `from_default_env` over a base directive.
pub fn setup(level: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.parse().unwrap_or_else(|_| "info".parse().expect("valid directive")))
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
