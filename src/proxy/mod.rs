//! Fetch-and-stage pipeline.
//!
//! [`Proxy::execute`] drives one inbound request end to end:
//! validate, stage a scratch file, fetch across redirects, promote, encode.
//! Every failure is folded into the JSONP payload; the scratch file is
//! removed and no-cache headers are set on every failure path.

pub mod client;
mod encoder;
mod housekeeping;
mod redirects;
mod staging;
mod types;
mod url_resolver;
mod validate;

use std::sync::Arc;
use std::time::SystemTime;

use log::{info, warn};

use crate::config::ProxySettings;
use crate::error_handling::{ProcessingStats, ProxyError};
use crate::hooks::PathHook;

pub use client::{Fetcher, HopOutcome, Sink, SocketClient, Transport};
pub use encoder::{ascii_to_inline, reference_url, render_failure, render_inline, render_reference};
pub use housekeeping::{cache_headers, stale_after, sweep_stale_files, within_budget, SweepReport};
pub use redirects::follow_redirects;
pub use staging::{extension_for_mime, StagedFile};
pub use types::{
    epoch_seconds, FetchOutcome, FetchRequest, FetchSuccess, ForwardedHeaders, ProxyResponse,
    RequestEnv, RequestOrigin,
};
pub use url_resolver::resolve;
pub use validate::{is_http_url, is_valid_callback, validate_request, Rejection};

/// The proxy engine shared by every request.
pub struct Proxy {
    settings: ProxySettings,
    transport: Arc<Transport>,
    hook: Option<Arc<dyn PathHook>>,
    stats: Arc<ProcessingStats>,
}

impl Proxy {
    pub fn new(settings: ProxySettings, transport: Arc<Transport>) -> Self {
        Self {
            settings,
            transport,
            hook: None,
            stats: Arc::new(ProcessingStats::new()),
        }
    }

    /// Installs the observer of [`crate::config::EVENT_SCRATCH_PATH`] events.
    pub fn with_hook(mut self, hook: Arc<dyn PathHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Shares outcome counters with other components.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    /// Whether https origins can be fetched.
    pub fn supports_tls(&self) -> bool {
        self.transport.supports_tls()
    }

    /// Handles one proxy request. Never fails: errors become the payload.
    pub async fn execute(&self, env: RequestEnv) -> ProxyResponse {
        let started = env.request_time;

        let request = match validate_request(&env, &self.settings) {
            Ok(request) => request,
            Err(Rejection { callback, error }) => {
                return self.fail(&callback, started, env.url.as_deref(), error).await;
            }
        };

        match self.fetch_and_render(&request).await {
            Ok((body, success)) => {
                self.stats.record_success();
                let headers =
                    cache_headers(true, started, SystemTime::now(), self.settings.cache_seconds);
                self.housekeeping(started).await;
                ProxyResponse {
                    body,
                    headers,
                    outcome: FetchOutcome::Success(success),
                }
            }
            Err(error) => {
                self.fail(
                    &request.callback_name,
                    started,
                    Some(&request.target_url),
                    error,
                )
                .await
            }
        }
    }

    /// Stages, fetches, promotes and encodes. The scratch file never
    /// outlives a failure.
    async fn fetch_and_render(
        &self,
        request: &FetchRequest,
    ) -> Result<(String, FetchSuccess), ProxyError> {
        let mut staged = StagedFile::create(
            &self.settings.images_path,
            &request.target_url,
            request.started_epoch(),
            self.hook.as_deref(),
        )
        .await?;

        let client = SocketClient::new(Arc::clone(&self.transport), request.forwarded.clone());
        let fetched = follow_redirects(&client, &request.target_url, staged.sink()?).await;
        let success = match fetched {
            Ok(success) => success,
            Err(e) => {
                staged.discard().await;
                return Err(e);
            }
        };

        let final_path = staged.promote(&success.mime).await?;
        info!(
            "Fetched {} as {} into {}",
            request.target_url,
            success.mime,
            final_path.display()
        );

        let body = if request.cross_domain_enabled {
            let bytes = tokio::fs::read(&final_path).await?;
            render_inline(
                &request.callback_name,
                &success.mime,
                success.charset.as_deref(),
                &bytes,
            )
        } else {
            let file_name = final_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            render_reference(
                &request.callback_name,
                &request.origin,
                &self.settings.public_dir,
                &file_name,
            )
        };

        Ok((body, success))
    }

    async fn fail(
        &self,
        callback: &str,
        started: SystemTime,
        url: Option<&str>,
        error: ProxyError,
    ) -> ProxyResponse {
        let category = error.category();
        warn!(
            "Proxy request for {} failed ({category}): {error}",
            url.unwrap_or("<no url>")
        );
        self.stats.record_failure(category);

        let reason = error.to_string();
        let headers = cache_headers(false, started, SystemTime::now(), self.settings.cache_seconds);
        self.housekeeping(started).await;

        ProxyResponse {
            body: render_failure(callback, &reason),
            headers,
            outcome: FetchOutcome::Failure { reason },
        }
    }

    /// Sweeps stale staged files unless the request is out of time.
    async fn housekeeping(&self, started: SystemTime) {
        let elapsed = SystemTime::now()
            .duration_since(started)
            .unwrap_or_default();
        if !within_budget(elapsed, self.settings.execution_budget_secs) {
            warn!(
                "Skipping staging sweep, {}s elapsed of a {}s budget",
                elapsed.as_secs(),
                self.settings.execution_budget_secs
            );
            return;
        }
        sweep_stale_files(
            &self.settings.images_path,
            started,
            stale_after(self.settings.cache_seconds),
        )
        .await;
    }
}
