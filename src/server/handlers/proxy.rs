//! Proxy endpoint handler.

use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{
        header::{self, HeaderMap, HeaderValue},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use log::{error, warn};

use super::super::types::{AppState, ProxyQuery};
use crate::config::JAVASCRIPT_CONTENT_TYPE;
use crate::error_handling::ProxyFault;
use crate::proxy::{ForwardedHeaders, RequestEnv};

/// Runs the fetch pipeline and answers with its JSONP body.
///
/// Handled failures are still a 200: the error lives in the payload. Only a
/// fault of the pipeline task itself goes through the fault bridge. An
/// unreadable query string is treated as an empty one, so the pipeline
/// answers it with a JSONP error too.
pub async fn proxy_handler(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
) -> Response {
    let query = match params {
        Ok(Query(pairs)) => ProxyQuery::from_pairs(pairs),
        Err(rejection) => {
            warn!("Unreadable proxy query string: {rejection}");
            ProxyQuery::default()
        }
    };

    let env = RequestEnv {
        host: header_text(&headers, header::HOST),
        port: state.listen_port,
        script_name: state.route.to_string(),
        request_time: SystemTime::now(),
        url: query.url,
        callback: query.callback,
        forwarded: ForwardedHeaders {
            accept: header_text(&headers, header::ACCEPT),
            user_agent: header_text(&headers, header::USER_AGENT),
            referer: header_text(&headers, header::REFERER),
        },
    };

    let proxy = Arc::clone(&state.proxy);
    match tokio::spawn(async move { proxy.execute(env).await }).await {
        Ok(result) => {
            let mut response = (StatusCode::OK, result.headers, result.body).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(JAVASCRIPT_CONTENT_TYPE),
            );
            response
        }
        Err(join_error) => {
            error!("Proxy task failed: {join_error}");
            state.stats.record_fault();
            ProxyFault::internal(format!("proxy task failed: {join_error}"))
                .into_response(state.exception_handler)
        }
    }
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
