//! `stockbook-observability` — process-level logging/tracing setup.

pub mod tracing;

pub use tracing::init;
