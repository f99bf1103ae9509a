//! Process-wide logging setup.

/// Initialize tracing with the format chosen by `LOG_FORMAT` (JSON by default).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formats).
pub mod tracing;
