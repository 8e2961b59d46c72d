//! Error handling and processing statistics.
//!
//! This module provides:
//! - The failure taxonomy of the fetch pipeline ([`ProxyError`])
//! - Initialization errors of the binary
//! - Infrastructure faults answered with an HTTP error status
//! - Outcome statistics shared across requests
//!
//! Failures are categorized into:
//! - **Validation**: request inputs or environment are unusable
//! - **Network**: the origin could not be reached or did not answer properly
//! - **Content**: the origin answered with something the proxy will not serve
//! - **Filesystem**: the staging directory could not be written

mod stats;
mod types;

// Re-export public API
pub use stats::{ProcessingStats, StatsSnapshot};
pub use types::{ErrorCategory, InitializationError, ProxyError, ProxyFault};
