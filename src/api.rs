use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::ScanConfig;
use crate::engine;
use crate::ensemble::Ensemble;
use crate::forensics::{build_face_detector, ForensicSuite};
use crate::verdict::{ScanResponse, Verdict};
use crate::video::VideoPipeline;

#[derive(Clone)]
pub struct AppState {
    pub ensemble: Arc<Ensemble>,
    pub forensics: Arc<ForensicSuite>,
    pub video: Arc<VideoPipeline>,
    pub config: Arc<ScanConfig>,
}

impl AppState {
    /// Build all process-wide handles once; read-only for the process
    /// lifetime afterwards (no reload, no hot-swap).
    pub fn from_config(cfg: ScanConfig) -> Self {
        let ensemble = Arc::new(Ensemble::from_config(&cfg));
        let forensics = Arc::new(ForensicSuite::standard(build_face_detector(
            &cfg.face_detector,
        )));
        let video = Arc::new(VideoPipeline::from_config(&cfg));
        Self {
            ensemble,
            forensics,
            video,
            config: Arc::new(cfg),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/scan-image", post(scan_image))
        .route("/scan-image/", post(scan_image))
        .route("/scan-video", post(scan_video))
        .route("/scan-video/", post(scan_video))
        .route("/debug/vocabulary", get(debug_vocabulary))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Multipart upload; the first field is the image. A scan that fails after
/// the upload was read still answers 200 with an ERROR verdict; transport
/// errors are reserved for malformed requests.
async fn scan_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, StatusCode> {
    let field = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
        .ok_or(StatusCode::BAD_REQUEST)?;
    let image = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
    if image.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    counter!("scans_total", "kind" => "image").increment(1);
    info!(media = %media_digest(&image), bytes = image.len(), "image scan requested");

    // Decode up front: a corrupt upload is a per-request failure, not a fault.
    if let Err(e) = image::load_from_memory(&image) {
        let report = crate::verdict::ScanReport::error(format!("Could not decode image: {e}"));
        counter!("scan_verdicts_total", "verdict" => verdict_label(report.verdict)).increment(1);
        return Ok(Json(report.to_response()));
    }

    let (scores, failsafe) = state.ensemble.score_image(&image).await;
    let mut extra = state.forensics.run(&image).await;
    extra.extend(failsafe);

    let report = engine::combine(&scores, &extra);
    counter!("scan_verdicts_total", "verdict" => verdict_label(report.verdict)).increment(1);
    Ok(Json(report.to_response()))
}

#[derive(serde::Deserialize)]
struct VideoScanRequest {
    url: String,
}

async fn scan_video(
    State(state): State<AppState>,
    Json(req): Json<VideoScanRequest>,
) -> Json<ScanResponse> {
    counter!("scans_total", "kind" => "video").increment(1);

    let report = if state.video.enabled {
        state.video.scan(&req.url, &state.ensemble).await
    } else {
        VideoPipeline::disabled_stub()
    };
    counter!("scan_verdicts_total", "verdict" => verdict_label(report.verdict)).increment(1);
    Json(report.to_response())
}

/// Diagnostics for the label-mapping hazard: shows the pinned vocabulary of
/// one collaborator.
async fn debug_vocabulary(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> String {
    let name = q.get("collaborator").cloned().unwrap_or_default();
    match state.config.collaborator(&name) {
        Some(c) => format!(
            "collaborator='{}' -> fake={:?}, real={:?}",
            c.name, c.vocabulary.fake_labels, c.vocabulary.real_labels
        ),
        None => format!("unknown collaborator '{}'", name),
    }
}

fn verdict_label(v: Verdict) -> &'static str {
    match v {
        Verdict::Fake => "fake",
        Verdict::Real => "real",
        Verdict::Error => "error",
    }
}

/// Short anonymized digest so logs never carry raw upload bytes.
pub(crate) fn media_digest(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
