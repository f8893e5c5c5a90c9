//! Optional video pipeline: download → extract frames → classify each →
//! average per collaborator → the single-image verdict rule.
//!
//! Ships disabled; the endpoint then answers with a fixed stub. When enabled,
//! frame extraction shells out to ffmpeg and all artifacts are scoped to the
//! request.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::ScanConfig;
use crate::engine::{self, CollaboratorScore};
use crate::ensemble::Ensemble;
use crate::scratch::{scratch_root, TempDir, TempMedia};
use crate::verdict::ScanReport;

/// Produces a bounded list of representative frames from a video file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract(&self, video: &Path, max_frames: usize) -> anyhow::Result<Vec<Vec<u8>>>;
}

pub type DynFrameExtractor = Arc<dyn FrameExtractor>;

/// Samples frames at one per second via ffmpeg, capped at `max_frames`.
pub struct FfmpegFrameExtractor;

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(&self, video: &Path, max_frames: usize) -> anyhow::Result<Vec<Vec<u8>>> {
        let frame_dir = TempDir::create(&scratch_root())?;
        let pattern = frame_dir.path().join("frame_%04d.png");

        let output = Command::new("ffmpeg")
            .args([
                "-i",
                video.to_str().context("non-UTF8 video path")?,
                "-vf",
                "fps=1",
                "-frames:v",
                &max_frames.to_string(),
                "-f",
                "image2",
                pattern.to_str().context("non-UTF8 frame path")?,
            ])
            .output()
            .await
            .context("failed to spawn ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg failed: {}", stderr.trim());
        }

        let mut paths: Vec<_> = std::fs::read_dir(frame_dir.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for p in paths.into_iter().take(max_frames) {
            frames.push(std::fs::read(&p)?);
        }
        Ok(frames)
    }
}

/// Fixture extractor for tests.
#[derive(Clone, Default)]
pub struct MockFrameExtractor {
    pub frames: Vec<Vec<u8>>,
}

#[async_trait]
impl FrameExtractor for MockFrameExtractor {
    async fn extract(&self, _video: &Path, max_frames: usize) -> anyhow::Result<Vec<Vec<u8>>> {
        Ok(self.frames.iter().take(max_frames).cloned().collect())
    }
}

/// Streams a remote video into a scoped temp file, enforcing a byte cap.
pub struct VideoDownloader {
    http: reqwest::Client,
    max_bytes: u64,
}

impl VideoDownloader {
    pub fn new(max_bytes: u64) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("media-sentinel/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("reqwest client");
        Self { http, max_bytes }
    }

    pub async fn download(&self, url: &str) -> anyhow::Result<TempMedia> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("video download request failed")?
            .error_for_status()
            .context("video download rejected")?;

        if let Some(len) = resp.content_length() {
            if len > self.max_bytes {
                bail!("video exceeds the {} byte download cap", self.max_bytes);
            }
        }

        let media = TempMedia::create(&scratch_root(), "mp4")?;
        let mut file = tokio::fs::File::create(media.path()).await?;
        let mut stream = resp.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("video download interrupted")?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                bail!("video exceeds the {} byte download cap", self.max_bytes);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        info!(bytes = written, "video downloaded");
        Ok(media)
    }
}

pub struct VideoPipeline {
    pub enabled: bool,
    max_frames: usize,
    downloader: VideoDownloader,
    extractor: DynFrameExtractor,
}

impl VideoPipeline {
    pub fn from_config(cfg: &ScanConfig) -> Self {
        Self {
            enabled: cfg.video.enabled,
            max_frames: cfg.video.max_frames,
            downloader: VideoDownloader::new(cfg.video.max_download_bytes),
            extractor: Arc::new(FfmpegFrameExtractor),
        }
    }

    pub fn with_extractor(mut self, extractor: DynFrameExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Fixed answer while the feature is off.
    pub fn disabled_stub() -> ScanReport {
        ScanReport::real(0.0).with_line("Video scanning is temporarily disabled.")
    }

    /// Full pipeline; every failure resolves to an ERROR report, never a fault.
    pub async fn scan(&self, url: &str, ensemble: &Ensemble) -> ScanReport {
        match self.scan_inner(url, ensemble).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "video scan failed");
                ScanReport::error(e.to_string())
            }
        }
    }

    async fn scan_inner(&self, url: &str, ensemble: &Ensemble) -> anyhow::Result<ScanReport> {
        // Both guards drop on every exit path below.
        let media = self.downloader.download(url).await?;
        let frames = self.extractor.extract(media.path(), self.max_frames).await?;
        if frames.is_empty() {
            bail!("no frames could be extracted from the video");
        }

        Ok(score_frames(ensemble, &frames).await)
    }
}

/// Classify every frame and average per collaborator with an unweighted mean,
/// then reuse the single-image verdict rule.
pub async fn score_frames(ensemble: &Ensemble, frames: &[Vec<u8>]) -> ScanReport {
    let mut sums: HashMap<String, (String, f32, usize)> = HashMap::new();
    let mut failsafe: Vec<String> = Vec::new();
    let mut scored_frames = 0usize;

    for frame in frames {
        let (scores, lines) = ensemble.score_image(frame).await;
        if scores.is_empty() {
            continue;
        }
        scored_frames += 1;
        for s in scores {
            let entry = sums
                .entry(s.name.clone())
                .or_insert_with(|| (s.specialty.clone(), 0.0, 0));
            entry.1 += s.score;
            entry.2 += 1;
        }
        for line in lines {
            if !failsafe.contains(&line) {
                failsafe.push(line);
            }
        }
    }

    if scored_frames == 0 {
        return ScanReport::error("No frame could be classified.").with_lines(failsafe);
    }

    // Keep the configured collaborator order stable in the report.
    let mut means: Vec<CollaboratorScore> = Vec::new();
    for collab in &ensemble.collaborators {
        if let Some((specialty, sum, n)) = sums.get(&collab.name) {
            means.push(CollaboratorScore::new(
                &collab.name,
                specialty,
                sum / *n as f32,
            ));
        }
    }

    let mut extra = vec![format!("Averaged {} frame(s) from video.", scored_frames)];
    extra.extend(failsafe);
    engine::combine(&means, &extra)
}
