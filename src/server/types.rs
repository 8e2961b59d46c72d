//! Server state and wire types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error_handling::{ProcessingStats, StatsSnapshot};
use crate::hooks::PathHook;
use crate::proxy::Proxy;

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<Proxy>,
    pub stats: Arc<ProcessingStats>,
    pub start_time: Arc<Instant>,
    /// Path of the proxy endpoint, reported to the pipeline as the script path
    pub route: Arc<str>,
    /// Port the listener accepted on; `None` until bound
    pub listen_port: Option<u16>,
    /// Whether faults are mapped to their own status code
    pub exception_handler: bool,
    /// Screenshot directory; the upload endpoint answers 404 when unset
    pub screen_path: Option<Arc<PathBuf>>,
    pub hook: Option<Arc<dyn PathHook>>,
}

/// Query string of the proxy endpoint.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProxyQuery {
    pub url: Option<String>,
    pub callback: Option<String>,
}

impl ProxyQuery {
    /// Picks `url` and `callback` out of raw query pairs. A repeated
    /// parameter keeps its last value; unknown parameters are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            match name.as_str() {
                "url" => query.url = Some(value),
                "callback" => query.callback = Some(value),
                _ => {}
            }
        }
        query
    }
}

/// Form body of the screenshot endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenForm {
    pub image: Option<String>,
}

/// JSON response of the screenshot endpoint.
#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub screen: String,
}

/// JSON response for `/status` endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: f64,
    pub requests: usize,
    pub tls_enabled: bool,
    pub cross_domain: bool,
    pub outcomes: StatsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_proxy_query_keeps_last_value() {
        let query = ProxyQuery::from_pairs(pairs(&[
            ("url", "http://a/x"),
            ("callback", "first"),
            ("url", "http://b/y"),
            ("callback", "second"),
            ("extra", "ignored"),
        ]));
        assert_eq!(query.url.as_deref(), Some("http://b/y"));
        assert_eq!(query.callback.as_deref(), Some("second"));
    }

    #[test]
    fn test_proxy_query_without_parameters() {
        assert_eq!(ProxyQuery::from_pairs(Vec::new()), ProxyQuery::default());
    }
}
