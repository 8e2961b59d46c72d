//! Request and outcome types of the fetch pipeline.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;

/// Inbound headers passed through to the origin when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedHeaders {
    pub accept: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Everything the routing layer knows about one inbound request.
///
/// Nothing in the pipeline reads ambient process state: host, port, script
/// path and forwarded headers all arrive through this struct.
#[derive(Debug, Clone)]
pub struct RequestEnv {
    /// Value of the inbound `Host` header
    pub host: Option<String>,
    /// Port the server accepted the request on
    pub port: Option<u16>,
    /// Path of the proxy endpoint, e.g. `/h2c/proxy`
    pub script_name: String,
    /// Moment the request reached the server
    pub request_time: SystemTime,
    /// `url` query parameter
    pub url: Option<String>,
    /// `callback` query parameter
    pub callback: Option<String>,
    pub forwarded: ForwardedHeaders,
}

/// Where the browser reached the proxy, used to build same-origin URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub host: String,
    pub port: u16,
    /// Directory part of the script path, `""` for the root
    pub script_dir: String,
}

/// A validated request. Immutable for the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub target_url: String,
    pub callback_name: String,
    pub cross_domain_enabled: bool,
    pub execution_budget_secs: u64,
    pub origin: RequestOrigin,
    pub forwarded: ForwardedHeaders,
    pub started_at: SystemTime,
}

impl FetchRequest {
    /// Request start as whole seconds since the Unix epoch.
    pub fn started_epoch(&self) -> u64 {
        epoch_seconds(self.started_at)
    }
}

/// Seconds since the Unix epoch, `0` for times before it.
pub fn epoch_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// What a successful fetch learned about the body it stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSuccess {
    /// Whitelisted, normalized media type
    pub mime: String,
    pub charset: Option<String>,
}

/// Final result of a request: exactly one of the two shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(FetchSuccess),
    Failure { reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Rendered response handed back to the routing layer.
#[derive(Debug)]
pub struct ProxyResponse {
    /// JavaScript callback invocation
    pub body: String,
    /// Cache and CORS headers
    pub headers: HeaderMap,
    pub outcome: FetchOutcome,
}
