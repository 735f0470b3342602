pub mod config;
pub mod telemetry;

/// Common utilities shared across the scamwatch project
///
/// This crate provides shared functionality used by the detection pipeline:
///
/// - YAML configuration loading
/// - Tracing bootstrap
/// - Shared test utilities

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-export commonly used test utilities for easier access
#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{init_test_tracing, unique_query};
