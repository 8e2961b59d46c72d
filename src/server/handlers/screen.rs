//! Screenshot upload handler.

use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::warn;

use super::super::types::{AppState, ScreenForm, ScreenResponse};
use crate::screen::save_screen;

/// Stores a posted `image` data URI and answers `{"screen": "<path>"}`.
pub async fn screen_handler(State(state): State<AppState>, Form(form): Form<ScreenForm>) -> Response {
    let Some(screen_path) = state.screen_path.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let image = form.image.unwrap_or_default();
    match save_screen(screen_path, state.hook.as_deref(), &image).await {
        Ok(path) => (
            StatusCode::OK,
            Json(ScreenResponse {
                screen: path.display().to_string(),
            }),
        )
            .into_response(),
        Err(fault) => {
            warn!("Screenshot upload failed: {fault}");
            state.stats.record_fault();
            fault.into_response(state.exception_handler)
        }
    }
}
