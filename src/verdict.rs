//! Verdict and report types returned by the scan endpoints.
//!
//! A scan produces a standardized triple: verdict + display confidence +
//! an ordered list of analysis lines. The JSON shape consumed by clients
//! renders the confidence as a percent string and joins the lines.

use serde::{Deserialize, Serialize};

/// Final verdict for a scanned piece of media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Fake,
    Real,
    Error,
}

/// Complete scan outcome including explainability lines.
///
/// `confidence` is the *display* percentage in [0, 100]: risk under a FAKE
/// verdict, authenticity under a REAL verdict. The inversion happens in the
/// ensemble engine, after the verdict is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub verdict: Verdict,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analysis: Vec<String>,
}

impl ScanReport {
    pub fn new(verdict: Verdict, confidence: f32) -> Self {
        Self {
            verdict,
            confidence: clamp_percent(confidence),
            analysis: Vec::new(),
        }
    }

    pub fn fake(confidence: f32) -> Self {
        Self::new(Verdict::Fake, confidence)
    }
    pub fn real(confidence: f32) -> Self {
        Self::new(Verdict::Real, confidence)
    }

    /// Failed scan: zero confidence, the message becomes the analysis text.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Verdict::Error, 0.0).with_line(message)
    }

    /// Append one analysis line (builder style).
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.analysis.push(line.into());
        self
    }

    /// Append many analysis lines, preserving order.
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.analysis.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Wire shape for the HTTP surface.
    pub fn to_response(&self) -> ScanResponse {
        ScanResponse {
            verdict: self.verdict,
            confidence_score: format!("{:.2}%", self.confidence),
            analysis: self.analysis.join("\n"),
        }
    }
}

/// JSON body returned by `/scan-image` and `/scan-video`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub verdict: Verdict,
    pub confidence_score: String,
    pub analysis: String,
}

fn clamp_percent(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 100.0 {
        100.0
    } else {
        x
    }
}
