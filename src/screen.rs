//! Screenshot upload.
//!
//! Browsers post the canvas rendering as a `data:image/png;base64,` URI;
//! the decoded PNG is stored under the screen directory with a random,
//! SHA-1 derived name.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::info;
use rand::Rng;

use crate::config::EVENT_SCREEN_PATH;
use crate::error_handling::ProxyFault;
use crate::hooks::{self, PathHook};
use crate::utils::sha1_hex;

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Decodes `image` and writes it to `<screen_dir>/<sha1>.png`, or wherever
/// the hook moves it. Returns the path written.
///
/// # Errors
///
/// - a 400 fault if `image` is empty or not valid base64
/// - a 500 fault if the file cannot be written
pub async fn save_screen(
    screen_dir: &Path,
    hook: Option<&dyn PathHook>,
    image: &str,
) -> Result<PathBuf, ProxyFault> {
    let payload = image.trim();
    let payload = payload.strip_prefix(PNG_DATA_URI_PREFIX).unwrap_or(payload);
    if payload.is_empty() {
        return Err(ProxyFault::bad_request("No such parameter \"image\""));
    }

    let decoded = STANDARD
        .decode(payload)
        .map_err(|e| ProxyFault::bad_request(format!("Parameter \"image\" is not valid base64: {e}")))?;

    let candidate = screen_dir.join(format!("{}.png", sha1_hex(&unique_id())));
    let path = hooks::dispatch(hook, EVENT_SCREEN_PATH, candidate);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ProxyFault::internal(format!("Cannot create directory `{}`: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(&path, &decoded).await.map_err(|e| {
        ProxyFault::internal(format!("Cannot create file `{}`: {e}", path.display()))
    })?;

    info!("Saved {} byte screenshot to {}", decoded.len(), path.display());
    Ok(path)
}

fn unique_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let salt: u64 = rand::rng().random();
    format!("{nanos:x}{salt:x}")
}
