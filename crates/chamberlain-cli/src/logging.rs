use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber.
///
/// Filter precedence: `--log-level`, then `RUST_LOG`, then `warn`.
pub fn init(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
