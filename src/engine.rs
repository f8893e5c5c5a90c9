//! # Ensemble Verdict Engine
//! Pure, testable logic that maps normalized collaborator scores → `ScanReport`.
//! No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy: a single collaborator above the high-confidence bar is trusted
//! outright (max wins); otherwise scores blend with equal weight. The verdict
//! threshold is strict: exactly 50% risk reads as REAL.

use crate::verdict::{ScanReport, Verdict};

/// A collaborator's score above this is trusted without blending.
pub const OVERRIDE_CONFIDENCE: f32 = 0.9;
/// Risk percentage strictly above this yields a FAKE verdict.
pub const FAKE_RISK_PERCENT: f32 = 50.0;

/// One normalized fake probability, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CollaboratorScore {
    /// Collaborator name, e.g. "vigilante".
    pub name: String,
    /// What this collaborator specializes in, e.g. "Face swap".
    pub specialty: String,
    /// Fake probability in [0, 1].
    pub score: f32,
}

impl CollaboratorScore {
    pub fn new(name: impl Into<String>, specialty: impl Into<String>, score: f32) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// Combine normalized scores and advisory forensic lines into a final report.
///
/// `extra_lines` are appended verbatim, in order, after the headline(s).
/// They never influence the numeric risk.
pub fn combine(scores: &[CollaboratorScore], extra_lines: &[String]) -> ScanReport {
    if scores.is_empty() {
        return ScanReport::error("No classification scores available.")
            .with_lines(extra_lines.iter().cloned());
    }

    let final_risk = final_risk_percent(scores);

    let verdict = if final_risk > FAKE_RISK_PERCENT {
        Verdict::Fake
    } else {
        Verdict::Real
    };

    // Display inversion happens only after the verdict is fixed: under REAL
    // the number shown is authenticity, not residual risk.
    let display = match verdict {
        Verdict::Real => 100.0 - final_risk,
        _ => final_risk,
    };

    let mut report = ScanReport::new(verdict, display);
    for line in headlines(verdict, display, scores) {
        report = report.with_line(line);
    }
    report.with_lines(extra_lines.iter().cloned())
}

/// The ensemble-combined risk as a percentage, before display inversion.
///
/// High-confidence override: one very sure specialist must not be diluted
/// by a less certain second opinion. Below the bar, equal-weight blend
/// (which for a single score is just that score).
pub fn final_risk_percent(scores: &[CollaboratorScore]) -> f32 {
    debug_assert!(!scores.is_empty());
    let max = scores
        .iter()
        .map(|s| s.score)
        .fold(f32::NEG_INFINITY, f32::max);

    if max > OVERRIDE_CONFIDENCE {
        max * 100.0
    } else {
        let sum: f32 = scores.iter().map(|s| s.score).sum();
        (sum / scores.len() as f32) * 100.0
    }
}

/// Headline lines for the report, one per qualifying collaborator.
fn headlines(verdict: Verdict, display: f32, scores: &[CollaboratorScore]) -> Vec<String> {
    match verdict {
        Verdict::Fake => {
            let critical: Vec<String> = scores
                .iter()
                .filter(|s| s.score > OVERRIDE_CONFIDENCE)
                .map(|s| {
                    format!(
                        "CRITICAL: {} detected by {}. Confidence: {:.1}%",
                        s.specialty, s.name, display
                    )
                })
                .collect();
            if critical.is_empty() {
                vec![format!(
                    "Suspicious artifacts detected by the ensemble. Confidence: {:.1}%",
                    display
                )]
            } else {
                critical
            }
        }
        Verdict::Real => vec![format!(
            "No anomalies found by the ensemble. Confidence: {:.1}%",
            display
        )],
        Verdict::Error => Vec::new(),
    }
}
