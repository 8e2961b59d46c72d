//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::constants::{CACHE_SECONDS, DEFAULT_EXECUTION_BUDGET_SECS};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Server configuration.
///
/// Every option can also be supplied through an `H2C_*` environment variable
/// (a `.env` file next to the binary is honoured).
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use h2c_proxy::Config;
///
/// let config = Config::parse_from(["h2c_proxy", "--images-path", "./images"]);
/// assert!(config.cross_domain);
/// ```
#[derive(Debug, Clone, Parser)]
#[command(name = "h2c_proxy", version, about)]
pub struct Config {
    /// Staging directory for fetched files
    #[arg(long, env = "H2C_IMAGES_PATH")]
    pub images_path: PathBuf,

    /// Answer with an inlined data URI instead of a same-origin URL
    #[arg(long, env = "H2C_CROSS_DOMAIN", default_value_t = true, action = ArgAction::Set)]
    pub cross_domain: bool,

    /// Map internal faults to HTTP status codes
    #[arg(long, env = "H2C_EXCEPTION_HANDLER", default_value_t = true, action = ArgAction::Set)]
    pub exception_handler: bool,

    /// Address the HTTP server listens on
    #[arg(long, env = "H2C_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Path of the proxy endpoint (its directory is the script directory)
    #[arg(long, env = "H2C_ROUTE", default_value = "/proxy")]
    pub route: String,

    /// URL segment, under the script directory, where staged files are served
    #[arg(long, env = "H2C_PUBLIC_DIR", default_value = "images")]
    pub public_dir: String,

    /// Execution budget per request, in seconds
    #[arg(long, env = "H2C_EXECUTION_BUDGET", default_value_t = DEFAULT_EXECUTION_BUDGET_SECS)]
    pub execution_budget: u64,

    /// Browser cache lifetime of successful responses, in seconds
    #[arg(long, env = "H2C_CACHE_SECONDS", default_value_t = CACHE_SECONDS)]
    pub cache_seconds: u64,

    /// Directory receiving uploaded screenshots (endpoint disabled when unset)
    #[arg(long, env = "H2C_SCREEN_PATH")]
    pub screen_path: Option<PathBuf>,

    /// Path of the screenshot upload endpoint
    #[arg(long, env = "H2C_SCREEN_ROUTE", default_value = "/screen")]
    pub screen_route: String,

    /// Log level
    #[arg(long, value_enum, env = "H2C_LOG_LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, env = "H2C_LOG_FORMAT", default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a configuration with defaults for everything but the staging directory.
    pub fn with_images_path(images_path: impl Into<PathBuf>) -> Self {
        Self {
            images_path: images_path.into(),
            cross_domain: true,
            exception_handler: true,
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            route: "/proxy".to_string(),
            public_dir: "images".to_string(),
            execution_budget: DEFAULT_EXECUTION_BUDGET_SECS,
            cache_seconds: CACHE_SECONDS,
            screen_path: None,
            screen_route: "/screen".to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }

    /// Projects the settings the fetch pipeline needs.
    pub fn proxy_settings(&self) -> ProxySettings {
        ProxySettings {
            images_path: self.images_path.clone(),
            cross_domain: self.cross_domain,
            execution_budget_secs: self.execution_budget,
            cache_seconds: self.cache_seconds,
            public_dir: self.public_dir.trim_matches('/').to_string(),
        }
    }

    /// Directory part of [`Config::route`], without a trailing slash.
    ///
    /// `/proxy` yields an empty string, `/h2c/proxy` yields `/h2c`.
    pub fn script_dir(&self) -> String {
        script_dir_of(&self.route)
    }
}

/// Returns the directory part of a script path, `""` for the root.
pub fn script_dir_of(script_name: &str) -> String {
    match script_name.rfind('/') {
        Some(idx) => {
            let dir = &script_name[..idx];
            if dir == "/" || dir == "\\" {
                String::new()
            } else {
                dir.to_string()
            }
        }
        None => String::new(),
    }
}

/// Immutable settings shared by every request handled by the pipeline.
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Staging directory
    pub images_path: PathBuf,
    /// Inline fetched content as a data URI
    pub cross_domain: bool,
    /// Execution budget in seconds
    pub execution_budget_secs: u64,
    /// Cache lifetime in seconds
    pub cache_seconds: u64,
    /// URL segment where staged files are served
    pub public_dir: String,
}
