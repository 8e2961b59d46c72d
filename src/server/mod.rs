//! HTTP server.
//!
//! Routes:
//! - `GET <route>` - the proxy endpoint, answering JSONP
//! - `GET <script dir>/<public dir>/{file}` - promoted files
//! - `POST <screen route>` - screenshot upload (404 unless a screen path is set)
//! - `GET /status` - JSON outcome counters

mod fault;
mod handlers;
mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, STATS_LOG_INTERVAL_SECS};
use crate::error_handling::ProcessingStats;
use crate::hooks::PathHook;
use crate::initialization::{init_staging_dir, init_transport};
use crate::proxy::{Proxy, Transport};

use handlers::{proxy_handler, screen_handler, staged_file_handler, status_handler};
pub use types::{AppState, ProxyQuery, ScreenForm, ScreenResponse, StatusResponse};

/// Assembles the shared state of every route.
pub fn build_state(
    config: &Config,
    transport: Arc<Transport>,
    listen_port: Option<u16>,
    hook: Option<Arc<dyn PathHook>>,
) -> AppState {
    let stats = Arc::new(ProcessingStats::new());
    let mut proxy = Proxy::new(config.proxy_settings(), transport).with_stats(Arc::clone(&stats));
    if let Some(hook) = &hook {
        proxy = proxy.with_hook(Arc::clone(hook));
    }

    AppState {
        proxy: Arc::new(proxy),
        stats,
        start_time: Arc::new(Instant::now()),
        route: Arc::from(config.route.as_str()),
        listen_port,
        exception_handler: config.exception_handler,
        screen_path: config.screen_path.clone().map(Arc::new),
        hook,
    }
}

/// Builds the router for `config`.
pub fn build_router(config: &Config, state: AppState) -> Router {
    let public_dir = config.proxy_settings().public_dir;
    let files_route = if public_dir.is_empty() {
        format!("{}/{{file}}", config.script_dir())
    } else {
        format!("{}/{public_dir}/{{file}}", config.script_dir())
    };

    Router::new()
        .route(&config.route, get(proxy_handler))
        .route(&files_route, get(staged_file_handler))
        .route(&config.screen_route, post(screen_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Binds `config.bind` and serves until Ctrl-C.
///
/// # Errors
///
/// Fails if the staging directory cannot be created, the address cannot be
/// bound, or the server stops with an I/O error.
pub async fn start_server(config: Config) -> Result<()> {
    init_staging_dir(&config.images_path)
        .await
        .context("Failed to prepare staging directory")?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind proxy server to {}", config.bind))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read the bound address")?;

    let state = build_state(&config, init_transport(), Some(local_addr.port()), None);
    let stats = Arc::clone(&state.stats);
    let app = build_router(&config, state);

    info!("Proxy listening on http://{local_addr}{}", config.route);
    info!("  - Status: http://{local_addr}/status");
    if config.screen_path.is_some() {
        info!("  - Screenshots: http://{local_addr}{}", config.screen_route);
    }

    let cancel = CancellationToken::new();
    let logging_task = tokio::spawn(log_stats_periodically(stats, cancel.child_token()));

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            shutdown.cancel();
        })
        .await
        .context("Proxy server error")?;

    cancel.cancel();
    let _ = logging_task.await;
    Ok(())
}

async fn log_stats_periodically(stats: Arc<ProcessingStats>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(STATS_LOG_INTERVAL_SECS));
    let mut last_total = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let snapshot = stats.snapshot();
                let total = snapshot.successes + snapshot.failures;
                if total != last_total {
                    info!(
                        "Served {total} proxy request(s): {} succeeded, {} failed, {} fault(s)",
                        snapshot.successes, snapshot.failures, snapshot.faults
                    );
                    last_total = total;
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}
