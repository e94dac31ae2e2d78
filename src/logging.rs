use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber; `RUST_LOG` takes precedence over `level`.
///
/// Stdout stays reserved for command output so it can be piped or parsed.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .with_target(false)
        .try_init();
}
