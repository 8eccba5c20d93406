//! Process-wide logging setup for storefront binaries.

pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};

/// Install the global subscriber using `RUST_LOG` and `STOREFRONT_LOG_FORMAT`.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(&LogConfig::from_env());
}
