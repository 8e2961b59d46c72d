// Shared test helpers: a scripted local origin server and proxy settings.
//
// The origin answers every connection with the bytes returned by a responder
// closure, keyed on the request path, and records each raw request.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use h2c_proxy::proxy::{ForwardedHeaders, RequestEnv};
use h2c_proxy::ProxySettings;

/// A running local origin.
#[allow(dead_code)] // Not every test file reads every field
pub struct Origin {
    /// `http://127.0.0.1:<port>`
    pub base: String,
    pub port: u16,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl Origin {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }
}

/// Starts an origin answering each request with `respond(path, port)`.
pub async fn spawn_origin<F>(respond: F) -> Origin
where
    F: Fn(&str, u16) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind origin");
    let port = listener.local_addr().expect("origin addr").port();
    let hits = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let hits_task = Arc::clone(&hits);
    let requests_task = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            hits_task.fetch_add(1, Ordering::SeqCst);
            let respond = Arc::clone(&respond);
            let requests = Arc::clone(&requests_task);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut received = Vec::new();
                loop {
                    let n = match sock.read(&mut buf).await {
                        Ok(n) => n,
                        Err(_) => return,
                    };
                    received.extend_from_slice(&buf[..n]);
                    if n == 0 || received.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let text = String::from_utf8_lossy(&received).to_string();
                let path = text
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                requests.lock().expect("lock").push(text);

                let response = respond(&path, port);
                let _ = sock.write_all(&response).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    Origin {
        base: format!("http://127.0.0.1:{port}"),
        port,
        hits,
        requests,
    }
}

/// A complete HTTP/1.0 response with the given status line, headers and body.
#[allow(dead_code)]
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.0 {status}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

#[allow(dead_code)]
pub fn settings(images_path: &Path, cross_domain: bool) -> ProxySettings {
    ProxySettings {
        images_path: images_path.to_path_buf(),
        cross_domain,
        execution_budget_secs: 60,
        cache_seconds: 300,
        public_dir: "images".to_string(),
    }
}

/// A request as the router would describe it, from `example.com` on port 80.
#[allow(dead_code)]
pub fn request_env(url: &str, callback: Option<&str>) -> RequestEnv {
    RequestEnv {
        host: Some("example.com".to_string()),
        port: Some(80),
        script_name: "/proxy".to_string(),
        request_time: SystemTime::now(),
        url: Some(url.to_string()),
        callback: callback.map(str::to_string),
        forwarded: ForwardedHeaders::default(),
    }
}

/// Every entry of a directory, sorted.
#[allow(dead_code)]
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}
