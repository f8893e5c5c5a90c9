//! Runtime collaborator set: built once at startup, read-only afterwards.
//!
//! Initialization is non-fatal. A collaborator without an endpoint (or whose
//! client cannot be built) stays in the lineup as disabled; per-request it
//! contributes a neutral fail-safe score instead of taking the scan down.

use std::io::Cursor;

use tracing::{info, warn};

use crate::classify::{build_classifier, DynClassifier};
use crate::config::ScanConfig;
use crate::engine::CollaboratorScore;
use crate::normalize::{self, LabelVocabulary, UNKNOWN_FALLBACK};

/// One specialized classification model plus its pinned vocabulary.
pub struct Collaborator {
    pub name: String,
    pub specialty: String,
    pub vocabulary: LabelVocabulary,
    pub client: DynClassifier,
}

pub struct Ensemble {
    pub collaborators: Vec<Collaborator>,
}

impl Ensemble {
    pub fn from_config(cfg: &ScanConfig) -> Self {
        let collaborators = cfg
            .collaborators
            .iter()
            .map(|c| Collaborator {
                name: c.name.clone(),
                specialty: c.specialty.clone(),
                vocabulary: c.vocabulary.clone(),
                client: build_classifier(c),
            })
            .collect::<Vec<_>>();
        info!(count = collaborators.len(), "ensemble initialized");
        Self { collaborators }
    }

    /// Score one image with every collaborator.
    ///
    /// A failed collaborator is substituted with a neutral 0.5 and noted in
    /// the returned fail-safe lines. If *no* collaborator produces a score,
    /// the score list comes back empty and the caller resolves to an ERROR
    /// verdict.
    pub async fn score_image(&self, image: &[u8]) -> (Vec<CollaboratorScore>, Vec<String>) {
        let mut scores = Vec::with_capacity(self.collaborators.len());
        let mut lines = Vec::new();
        let mut successes = 0usize;

        for collab in &self.collaborators {
            match collab.client.classify(image).await {
                Ok(preds) => {
                    let p = normalize::fake_probability(&preds, &collab.vocabulary);
                    info!(collaborator = %collab.name, score = p, "collaborator scored image");
                    scores.push(CollaboratorScore::new(&collab.name, &collab.specialty, p));
                    successes += 1;
                }
                Err(e) => {
                    warn!(collaborator = %collab.name, error = %e, "collaborator failed; substituting neutral score");
                    scores.push(CollaboratorScore::new(
                        &collab.name,
                        &collab.specialty,
                        UNKNOWN_FALLBACK,
                    ));
                    lines.push(format!(
                        "Fail-safe: {} unavailable; neutral score substituted.",
                        collab.name
                    ));
                }
            }
        }

        if successes == 0 {
            // Nothing real to combine; let the caller escalate to ERROR.
            return (Vec::new(), lines);
        }
        (scores, lines)
    }

    /// One-off startup smoke test against a generated sample image.
    /// Logs outcomes; never panics and never fails the boot.
    pub async fn quick_probe(&self) {
        let sample = probe_image();
        for collab in &self.collaborators {
            match collab.client.classify(&sample).await {
                Ok(preds) => info!(
                    collaborator = %collab.name,
                    classes = preds.len(),
                    "quick probe ok"
                ),
                Err(e) => warn!(collaborator = %collab.name, error = %e, "quick probe failed"),
            }
        }
    }
}

/// Tiny in-memory PNG used by the startup probe.
fn probe_image() -> Vec<u8> {
    use image::{DynamicImage, Rgb, RgbImage};
    let img = RgbImage::from_pixel(8, 8, Rgb([127, 127, 127]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("in-memory png encode");
    buf
}
