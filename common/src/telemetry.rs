use tracing_subscriber::EnvFilter;

/// Initialize tracing for an executable. The configured level is used as the
/// default directive; RUST_LOG still takes precedence when set.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Same as [`init_tracing`] but safe to call from multiple tests; the first
/// caller wins and later calls are ignored.
pub fn init_tracing_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
