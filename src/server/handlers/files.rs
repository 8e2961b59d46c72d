//! Staged file handler.

use std::io;

use axum::{
    extract::{Path, State},
    http::{
        header::{self, HeaderValue},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use log::warn;

use super::super::types::AppState;
use crate::config::TMP_FILE_PREFIX;

/// Serves a promoted file from the staging directory.
///
/// Only plain staging file names with a promoted extension are served;
/// anything else, in-flight scratch files included, is a 404.
pub async fn staged_file_handler(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Response {
    if !file.starts_with(TMP_FILE_PREFIX) || file.contains(['/', '\\']) || file.contains("..") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(content_type) = content_type_for(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let path = state.proxy.settings().images_path.join(&file);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            warn!("Cannot read staged file {}: {e}", path.display());
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        ],
        bytes,
    )
        .into_response()
}

/// Media type of a promoted file, from the extension it was given.
/// `None` for anything promotion never produces.
fn content_type_for(file: &str) -> Option<&'static str> {
    let content_type = match file.rsplit_once('.').map(|(_, ext)| ext)? {
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "html" => "text/html",
        "xhtml" => "application/xhtml+xml",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("h2c_a.1_2.png"), Some("image/png"));
        assert_eq!(content_type_for("h2c_a.1_2.jpg"), Some("image/jpeg"));
        assert_eq!(content_type_for("h2c_a.1_2.svg"), Some("image/svg+xml"));
        assert_eq!(content_type_for("h2c_a.1_2.xhtml"), Some("application/xhtml+xml"));
    }

    #[test]
    fn test_scratch_names_have_no_content_type() {
        assert_eq!(content_type_for("h2c_a.1_2"), None);
        assert_eq!(content_type_for("h2c_a.123_1700000000"), None);
        assert_eq!(content_type_for("h2c_a.1_2.exe"), None);
        assert_eq!(content_type_for("h2c_a"), None);
    }
}
