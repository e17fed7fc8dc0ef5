//! Telemetry setup shared by the runner binary and the test suites.

pub mod tracing;
