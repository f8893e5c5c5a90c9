//! Forensic heuristics ("Prism" suite): metadata inspection, error-level
//! analysis, and face-geometry checks.
//!
//! Every scan is advisory. Output is free-text log lines appended to the
//! report; nothing here feeds the numeric risk. A scan that fails internally
//! is reduced to a single informational line and never aborts the request.

pub mod ela;
pub mod geometry;
pub mod metadata;

pub use ela::ElaScan;
pub use geometry::{build_face_detector, DynFaceDetector, FaceBox, FaceDetector, GeometryScan};
pub use metadata::MetadataScan;

use async_trait::async_trait;
use tracing::{debug, warn};

/// One independent heuristic check over the raw image bytes.
#[async_trait]
pub trait ForensicScan: Send + Sync {
    fn name(&self) -> &'static str;
    async fn scan(&self, image: &[u8]) -> anyhow::Result<Vec<String>>;
}

/// Ordered collection of scans with an absorb-all-failures boundary.
pub struct ForensicSuite {
    scans: Vec<Box<dyn ForensicScan>>,
}

impl ForensicSuite {
    /// The standard three-scan lineup.
    pub fn standard(face_detector: DynFaceDetector) -> Self {
        Self {
            scans: vec![
                Box::new(MetadataScan),
                Box::new(ElaScan),
                Box::new(GeometryScan::new(face_detector)),
            ],
        }
    }

    /// No scans at all; the report carries classifier output only.
    pub fn disabled() -> Self {
        Self { scans: Vec::new() }
    }

    /// Run every scan in order. Infallible: errors become one line each.
    pub async fn run(&self, image: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for scan in &self.scans {
            match scan.scan(image).await {
                Ok(out) => {
                    debug!(scan = scan.name(), lines = out.len(), "forensic scan done");
                    lines.extend(out.into_iter().map(|l| format!("[{}] {}", scan.name(), l)));
                }
                Err(e) => {
                    warn!(scan = scan.name(), error = %e, "forensic scan failed");
                    lines.push(format!("[{}] Scan unavailable: {}", scan.name(), e));
                }
            }
        }
        lines
    }
}
