// tests/metrics.rs
//
// The Prometheus recorder can only be installed once per process, so this
// lives in its own test binary.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt as _;

use media_sentinel::metrics::Metrics;

#[tokio::test]
async fn metrics_endpoint_renders_the_collaborator_gauge() {
    let metrics = Metrics::init(2);

    let req = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .expect("build GET /metrics");

    let resp = metrics
        .router()
        .oneshot(req)
        .await
        .expect("oneshot /metrics");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec();
    let text = String::from_utf8(bytes).expect("utf8");
    assert!(text.contains("scan_collaborators"));
}
