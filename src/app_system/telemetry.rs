use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: compact output with an uptime timer.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used. Calling it
/// again after a subscriber is installed is a no-op, so tests may call it freely.
pub fn setup_tracing(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .try_init();
}
