use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber. Honors `RUST_LOG`, falling back
/// to `default_directive` (e.g. `info`). Logs go to stderr so that command
/// output on stdout stays machine readable.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
