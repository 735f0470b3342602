/// Shared test helpers for cross-crate use.
///
/// Centralized utilities used by the `detection` integration tests to avoid
/// duplicating setup code across test files.
use std::sync::atomic::{AtomicU64, Ordering};

// Global counter for unique identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique query string for tests running in parallel.
///
/// # Arguments
/// * `prefix` - identifies the test scenario (e.g. "scam-query")
pub fn unique_query(prefix: &str) -> String {
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{} {}", prefix, counter)
}

/// Initialize tracing once for a test binary.
pub fn init_test_tracing() {
    crate::telemetry::init_tracing_for_tests();
}
