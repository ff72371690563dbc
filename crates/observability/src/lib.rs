//! Process-wide logging setup shared by the client binary and tools.

/// Initialize tracing with the default filter (`info`, overridable through
/// `RUST_LOG`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_FILTER);
}

/// Subscriber configuration (filters, formatter).
pub mod tracing;
