//! Score normalization: raw classifier output → one fake probability.
//!
//! Classification collaborators disagree about label vocabularies
//! ("fake"/"real", "deepfake"/"natural", bare "label_0"/"label_1"), and the
//! numeric-label-to-class mapping has flipped between model versions. The
//! vocabulary is therefore pinned per collaborator in config rather than
//! hardcoded here; anything not covered degrades to the 0.5 unknown fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::RawPrediction;

/// Returned when no configured label is recognized: maximal uncertainty.
pub const UNKNOWN_FALLBACK: f32 = 0.5;

static NUMERIC_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^label[_ ]?\d+$").expect("valid numeric-label regex"));

/// Pinned label-to-class mapping for one classification collaborator.
///
/// Labels are matched case-insensitively; sets are normalized to lowercase
/// at load time via [`LabelVocabulary::sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    #[serde(default = "default_fake_labels")]
    pub fake_labels: Vec<String>,
    #[serde(default = "default_real_labels")]
    pub real_labels: Vec<String>,
}

fn default_fake_labels() -> Vec<String> {
    ["fake", "deepfake", "artificial", "label_1"]
        .map(String::from)
        .to_vec()
}

fn default_real_labels() -> Vec<String> {
    ["real", "natural", "label_0"].map(String::from).to_vec()
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self {
            fake_labels: default_fake_labels(),
            real_labels: default_real_labels(),
        }
    }
}

impl LabelVocabulary {
    /// Lowercase both sets so lookups stay case-insensitive.
    pub fn sanitize(&mut self) {
        for l in self.fake_labels.iter_mut().chain(self.real_labels.iter_mut()) {
            *l = l.trim().to_lowercase();
        }
        self.fake_labels.retain(|l| !l.is_empty());
        self.real_labels.retain(|l| !l.is_empty());
    }

    pub fn is_fake(&self, label: &str) -> bool {
        self.fake_labels.iter().any(|l| l == label)
    }

    pub fn is_real(&self, label: &str) -> bool {
        self.real_labels.iter().any(|l| l == label)
    }
}

/// Collapse a raw prediction sequence into one fake probability in [0, 1].
///
/// Later duplicate labels overwrite earlier ones. A fake-class score of
/// exactly 0.0 is indistinguishable from "label absent" under this scheme;
/// that is a known limitation of the upstream contract, kept as-is.
///
/// Never fails: empty input and unrecognized vocabularies return
/// [`UNKNOWN_FALLBACK`].
pub fn fake_probability(predictions: &[RawPrediction], vocab: &LabelVocabulary) -> f32 {
    let mut fake_score = 0.0f32;
    let mut real_score = 0.0f32;

    for pred in predictions {
        let label = pred.label.trim().to_lowercase();
        if vocab.is_fake(&label) {
            fake_score = pred.score;
        } else if vocab.is_real(&label) {
            real_score = pred.score;
        } else if NUMERIC_LABEL.is_match(&label) {
            // Numeric labels have flipped meaning across model versions;
            // an unmapped one needs a manual vocabulary pin, not a guess.
            warn!(
                target: "normalize",
                %label,
                score = pred.score,
                "unmapped numeric label; pin it in the collaborator vocabulary"
            );
        }
    }

    if fake_score != 0.0 {
        fake_score.clamp(0.0, 1.0)
    } else if real_score != 0.0 {
        (1.0 - real_score).clamp(0.0, 1.0)
    } else {
        UNKNOWN_FALLBACK
    }
}
