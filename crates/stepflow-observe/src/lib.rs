//! Observability setup for Stepflow binaries.

pub mod tracing_setup;
