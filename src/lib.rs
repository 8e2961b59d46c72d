//! h2c_proxy library: a same-origin proxy for html2canvas
//!
//! Browsers cannot read pixels of cross-origin images drawn on a canvas. This
//! library fetches such resources server-side over a minimal HTTP/1.0 client,
//! stages them on disk, and answers with a JSONP callback carrying either an
//! inlined data URI or a same-origin URL of the staged copy.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::SystemTime;
//!
//! use h2c_proxy::proxy::{ForwardedHeaders, Proxy, RequestEnv, Transport};
//! use h2c_proxy::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::with_images_path("./images");
//! let proxy = Proxy::new(config.proxy_settings(), Arc::new(Transport::with_tls()?));
//!
//! let response = proxy
//!     .execute(RequestEnv {
//!         host: Some("localhost:8080".to_string()),
//!         port: Some(8080),
//!         script_name: "/proxy".to_string(),
//!         request_time: SystemTime::now(),
//!         url: Some("https://example.com/logo.png".to_string()),
//!         callback: Some("onImage".to_string()),
//!         forwarded: ForwardedHeaders::default(),
//!     })
//!     .await;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod config;
pub mod error_handling;
pub mod hooks;
pub mod initialization;
pub mod proxy;
pub mod screen;
pub mod server;
mod utils;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, ProxySettings};
pub use error_handling::{ProxyError, ProxyFault};
pub use hooks::{PathEvent, PathHook};
pub use proxy::{FetchOutcome, Proxy, ProxyResponse};
pub use server::{build_router, build_state, start_server};
