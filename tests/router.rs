//! Router tests: the HTTP surface driven through `tower::ServiceExt::oneshot`.

mod helpers;

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tempfile::TempDir;
use tower::ServiceExt;

use h2c_proxy::proxy::Transport;
use h2c_proxy::{build_router, build_state, Config};
use helpers::{dir_entries, http_response, spawn_origin};

const PNG_BODY: &[u8] = b"\x89PNG\r\n\x1a\nrouter";

fn config(images_path: &Path) -> Config {
    Config::with_images_path(images_path)
}

fn router(config: &Config, listen_port: Option<u16>) -> Router {
    let state = build_state(
        config,
        Arc::new(Transport::plain_only()),
        listen_port,
        None,
    );
    build_router(config, state)
}

fn proxy_uri(url: &str, callback: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("url", url);
    if let Some(callback) = callback {
        query.append_pair("callback", callback);
    }
    format!("/proxy?{}", query.finish())
}

fn get(uri: &str, host: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(host) = host {
        builder = builder.header(header::HOST, host);
    }
    builder.body(Body::empty()).expect("request")
}

fn screen_post(image: &str) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("image", image)
        .finish();
    Request::builder()
        .method("POST")
        .uri("/screen")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8_lossy(&bytes).to_string()
}

fn header_of<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_proxy_route_answers_jsonp() {
    let dir = TempDir::new().expect("tempdir");
    let origin = spawn_origin(|_, _| {
        http_response("200 OK", &[("Content-Type", "image/png")], PNG_BODY)
    })
    .await;
    let app = router(&config(dir.path()), Some(80));

    let response = app
        .oneshot(get(&proxy_uri(&origin.url("/a.png"), Some("cb")), Some("example.com")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_of(&response, header::CONTENT_TYPE),
        Some("application/javascript")
    );
    assert_eq!(header_of(&response, header::CACHE_CONTROL), Some("max-age=299999"));
    assert_eq!(
        body_text(response).await,
        format!("cb(\"data:image/png;base64,{}\");", STANDARD.encode(PNG_BODY))
    );
}

#[tokio::test]
async fn test_missing_host_is_reported_in_payload() {
    let dir = TempDir::new().expect("tempdir");
    let app = router(&config(dir.path()), Some(80));

    let response = app
        .oneshot(get(&proxy_uri("http://a.test/x.png", None), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_of(&response, header::CACHE_CONTROL), Some("no-cache"));
    assert_eq!(
        body_text(response).await,
        "console.log(\"error: html2canvas-proxy-php: The client did not send the Host header\");"
    );
}

#[tokio::test]
async fn test_unknown_listen_port_is_reported_in_payload() {
    let dir = TempDir::new().expect("tempdir");
    let app = router(&config(dir.path()), None);

    let response = app
        .oneshot(get(&proxy_uri("http://a.test/x.png", Some("cb")), Some("example.com")))
        .await
        .expect("response");

    let body = body_text(response).await;
    assert!(
        body.contains("The server did not report the listening port"),
        "{body}"
    );
}

#[tokio::test]
async fn test_reference_url_is_served_back() {
    let dir = TempDir::new().expect("tempdir");
    let origin = spawn_origin(|_, _| {
        http_response("200 OK", &[("Content-Type", "image/png")], PNG_BODY)
    })
    .await;
    let mut config = config(dir.path());
    config.cross_domain = false;
    let app = router(&config, Some(80));

    let response = app
        .clone()
        .oneshot(get(&proxy_uri(&origin.url("/a.png"), None), Some("example.com")))
        .await
        .expect("response");
    let body = body_text(response).await;

    let files = dir_entries(dir.path());
    assert_eq!(files.len(), 1);
    let file_name = files[0]
        .file_name()
        .expect("name")
        .to_string_lossy()
        .to_string();
    assert_eq!(
        body,
        format!("console.log(\"http://example.com/images/{file_name}\");")
    );

    let response = app
        .oneshot(get(&format!("/images/{file_name}"), Some("example.com")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_of(&response, header::CONTENT_TYPE), Some("image/png"));
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(bytes.as_ref(), PNG_BODY);
}

#[tokio::test]
async fn test_staged_file_route_rejects_foreign_names() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("secret.txt"), b"nope").expect("write");
    let app = router(&config(dir.path()), Some(80));

    for uri in ["/images/secret.txt", "/images/h2c_missing.png", "/images/h2c_..%2Fsecret.txt"] {
        let response = app
            .clone()
            .oneshot(get(uri, Some("example.com")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_status_reports_outcomes() {
    let dir = TempDir::new().expect("tempdir");
    let app = router(&config(dir.path()), Some(80));

    // One validation failure
    app.clone()
        .oneshot(get("/proxy?url=ftp%3A%2F%2Fx", Some("example.com")))
        .await
        .expect("response");

    let response = app
        .oneshot(get("/status", None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(json["requests"], 1);
    assert_eq!(json["tls_enabled"], false);
    assert_eq!(json["cross_domain"], true);
    assert_eq!(json["outcomes"]["failures"], 1);
    assert_eq!(json["outcomes"]["validation_failures"], 1);
    assert_eq!(json["outcomes"]["successes"], 0);
}

#[tokio::test]
async fn test_screen_route_disabled_without_screen_path() {
    let dir = TempDir::new().expect("tempdir");
    let app = router(&config(dir.path()), Some(80));

    let response = app
        .oneshot(screen_post("data:image/png;base64,AAAA"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_screen_upload_stores_png() {
    let dir = TempDir::new().expect("tempdir");
    let screens = dir.path().join("screens");
    let mut config = config(dir.path());
    config.screen_path = Some(screens.clone());
    let app = router(&config, Some(80));

    let image = format!("data:image/png;base64,{}", STANDARD.encode(PNG_BODY));
    let response = app.oneshot(screen_post(&image)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json");
    let saved = json["screen"].as_str().expect("screen path");
    assert!(Path::new(saved).starts_with(&screens));
    assert_eq!(std::fs::read(saved).expect("read"), PNG_BODY);
}

#[tokio::test]
async fn test_screen_fault_uses_bridge_status() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = config(dir.path());
    config.screen_path = Some(dir.path().join("screens"));
    let app = router(&config, Some(80));

    let response = app
        .oneshot(screen_post("data:image/png;base64,***"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: String = serde_json::from_str(&body_text(response).await).expect("json string");
    assert!(body.starts_with("error: Parameter \"image\" is not valid base64"), "{body}");
}

#[tokio::test]
async fn test_screen_fault_without_bridge_is_bare_500() {
    let dir = TempDir::new().expect("tempdir");
    let mut config = config(dir.path());
    config.screen_path = Some(dir.path().join("screens"));
    config.exception_handler = false;
    let app = router(&config, Some(80));

    let response = app
        .oneshot(screen_post("data:image/png;base64,***"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_repeated_query_parameters_keep_last_value() {
    let dir = TempDir::new().expect("tempdir");
    let origin = spawn_origin(|path, _| match path {
        "/second.png" => http_response("200 OK", &[("Content-Type", "image/png")], PNG_BODY),
        _ => http_response("404 Not Found", &[], b""),
    })
    .await;
    let app = router(&config(dir.path()), Some(80));

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("url", &origin.url("/first.png"));
    query.append_pair("callback", "first");
    query.append_pair("url", &origin.url("/second.png"));
    query.append_pair("callback", "second");
    let uri = format!("/proxy?{}", query.finish());

    let response = app
        .oneshot(get(&uri, Some("example.com")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_of(&response, header::CONTENT_TYPE),
        Some("application/javascript")
    );
    assert_eq!(
        body_text(response).await,
        format!("second(\"data:image/png;base64,{}\");", STANDARD.encode(PNG_BODY))
    );
    assert_eq!(origin.hits(), 1);
}

#[tokio::test]
async fn test_repeated_url_without_fetchable_value_is_jsonp_error() {
    let dir = TempDir::new().expect("tempdir");
    let app = router(&config(dir.path()), Some(80));

    let response = app
        .oneshot(get(
            "/proxy?url=http%3A%2F%2Fa%2Fx&url=ftp%3A%2F%2Fb%2Fy&callback=cb",
            Some("example.com"),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_of(&response, header::CONTENT_TYPE),
        Some("application/javascript")
    );
    assert_eq!(
        body_text(response).await,
        "cb(\"error: html2canvas-proxy-php: No such parameter \\\"url\\\" or it is not an http(s) url\");"
    );
}

#[tokio::test]
async fn test_scratch_files_are_not_served() {
    let dir = TempDir::new().expect("tempdir");
    let scratch = "h2c_0123456789abcdef.42_1700000000";
    std::fs::write(dir.path().join(scratch), b"half written").expect("write");
    let app = router(&config(dir.path()), Some(80));

    let response = app
        .oneshot(get(&format!("/images/{scratch}"), Some("example.com")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
