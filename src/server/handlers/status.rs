//! JSON status handler.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::super::types::{AppState, StatusResponse};

/// JSON status endpoint with outcome counters
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let outcomes = state.stats.snapshot();

    let response = StatusResponse {
        uptime_seconds: state.start_time.elapsed().as_secs_f64(),
        requests: outcomes.successes + outcomes.failures,
        tls_enabled: state.proxy.supports_tls(),
        cross_domain: state.proxy.settings().cross_domain,
        outcomes,
    };

    (StatusCode::OK, Json(response)).into_response()
}
