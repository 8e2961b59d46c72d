//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources of the
//! server:
//! - Logger
//! - TLS crypto provider
//! - Origin transport (TLS-capable when possible)
//! - Staging directory

mod logger;

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use rustls::crypto::{ring::default_provider, CryptoProvider};

use crate::error_handling::InitializationError;
use crate::proxy::Transport;

// Re-export public API
pub use logger::init_logger_with;

/// Initializes the crypto provider for TLS operations.
///
/// Configures the global crypto provider for `rustls`. Must be called before
/// any TLS connection is established.
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}

/// Builds the transport used to reach origins.
///
/// Falls back to a plain-only transport when the TLS configuration cannot be
/// built; https fetches then fail with a `TlsUnsupported` payload instead of
/// preventing startup.
pub fn init_transport() -> Arc<Transport> {
    match Transport::with_tls() {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            warn!("{e}. Continuing without https support.");
            Arc::new(Transport::plain_only())
        }
    }
}

/// Creates the staging directory if it does not exist yet.
///
/// # Errors
///
/// Returns `InitializationError::StagingError` if the directory cannot be created.
pub async fn init_staging_dir(path: &Path) -> Result<(), InitializationError> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        InitializationError::StagingError(format!("{}: {e}", path.display()))
    })?;
    info!("Staging files in {}", path.display());
    Ok(())
}
