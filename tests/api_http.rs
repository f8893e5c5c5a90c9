// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with
// SCAN_TEST_MODE=mock so no real inference endpoint is contacted.
//
// Covered:
// - GET /health
// - POST /scan-image  (happy path, corrupt upload, empty upload)
// - POST /scan-video  (disabled stub)
// - GET /debug/vocabulary

use std::io::Cursor;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use serial_test::serial;
use tower::ServiceExt as _; // for `oneshot`

use media_sentinel::api::AppState;
use media_sentinel::config::ScanConfig;
use media_sentinel::{api, ScanResponse};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests
const BOUNDARY: &str = "sentinel-test-boundary";

/// Build the same Router the binary uses, on mock collaborators.
fn test_router() -> Router {
    std::env::set_var("SCAN_TEST_MODE", "mock");
    let state = AppState::from_config(ScanConfig::default());
    api::create_router(state)
}

fn sample_png() -> Vec<u8> {
    use image::{DynamicImage, Rgb, RgbImage};
    let img = RgbImage::from_pixel(32, 32, Rgb([90, 120, 150]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("png encode");
    buf
}

fn multipart_body(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    out.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"sample.png\"\r\n",
    );
    out.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    out.extend_from_slice(bytes);
    out.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    out
}

fn multipart_request(uri: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(bytes)))
        .expect("build multipart request")
}

async fn read_scan_response(resp: axum::response::Response) -> ScanResponse {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse scan response")
}

#[tokio::test]
#[serial]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
#[serial]
async fn api_scan_image_answers_the_contract_shape() {
    let app = test_router();

    let resp = app
        .oneshot(multipart_request("/scan-image", &sample_png()))
        .await
        .expect("oneshot /scan-image");
    assert_eq!(resp.status(), StatusCode::OK);

    let out = read_scan_response(resp).await;
    // Mock collaborators answer real=0.98 → 2% blended risk → REAL at 98%.
    assert_eq!(serde_json::to_value(out.verdict).unwrap(), Json::from("REAL"));
    assert_eq!(out.confidence_score, "98.00%");

    let lines: Vec<&str> = out.analysis.lines().collect();
    assert!(lines[0].starts_with("No anomalies found"));
    assert!(lines.iter().any(|l| l.starts_with("[metadata]")));
    assert!(lines.iter().any(|l| l.starts_with("[ela]")));
    assert!(lines.iter().any(|l| l.starts_with("[geometry]")));
}

#[tokio::test]
#[serial]
async fn api_scan_image_trailing_slash_alias_works() {
    let app = test_router();

    let resp = app
        .oneshot(multipart_request("/scan-image/", &sample_png()))
        .await
        .expect("oneshot /scan-image/");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[serial]
async fn api_scan_image_corrupt_upload_is_an_error_verdict_not_a_transport_error() {
    let app = test_router();

    let resp = app
        .oneshot(multipart_request("/scan-image", b"not an image at all"))
        .await
        .expect("oneshot corrupt upload");
    assert_eq!(resp.status(), StatusCode::OK);

    let out = read_scan_response(resp).await;
    assert_eq!(
        serde_json::to_value(out.verdict).unwrap(),
        Json::from("ERROR")
    );
    assert_eq!(out.confidence_score, "0.00%");
    assert!(out.analysis.contains("Could not decode image"));
}

#[tokio::test]
#[serial]
async fn api_scan_image_without_a_file_field_is_a_bad_request() {
    let app = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/scan-image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(format!("--{BOUNDARY}--\r\n")))
        .expect("build empty multipart");

    let resp = app.oneshot(req).await.expect("oneshot empty multipart");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn api_scan_video_disabled_stub_is_fixed() {
    let app = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/scan-video")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url":"https://example.com/clip.mp4"}"#))
        .expect("build POST /scan-video");

    let resp = app.oneshot(req).await.expect("oneshot /scan-video");
    assert_eq!(resp.status(), StatusCode::OK);

    let out = read_scan_response(resp).await;
    assert_eq!(serde_json::to_value(out.verdict).unwrap(), Json::from("REAL"));
    assert_eq!(out.confidence_score, "0.00%");
    assert!(out.analysis.contains("disabled"));
}

#[tokio::test]
#[serial]
async fn api_debug_vocabulary_shows_the_pinned_mapping() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/debug/vocabulary?collaborator=vigilante")
        .body(Body::empty())
        .expect("build GET /debug/vocabulary");

    let resp = app.oneshot(req).await.expect("oneshot vocabulary");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("vigilante"));
    assert!(text.contains("fake"));
}
