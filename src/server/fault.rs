//! Fault-to-status bridge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::error_handling::ProxyFault;

impl ProxyFault {
    /// Renders the fault as an HTTP error response.
    ///
    /// With the bridge enabled the status is the fault's code (500 when the
    /// code is 0 or not a valid status) and the body is the JSON string
    /// `"error: <message>"`. With the bridge disabled every fault is a bare 500.
    pub fn into_response(self, bridge_enabled: bool) -> Response {
        if !bridge_enabled {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        let status = match self.code {
            0 => StatusCode::INTERNAL_SERVER_ERROR,
            code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        };
        (status, Json(format!("error: {}", self.message))).into_response()
    }
}
