//! Service configuration: collaborator endpoints, pinned label vocabularies,
//! and the optional video pipeline.
//!
//! Loaded once at startup from `config/scan.toml` (override with
//! `SCAN_CONFIG_PATH`). API keys use the `"ENV"` sentinel and resolve from
//! `<NAME>_API_KEY`. A missing or broken file degrades to built-in defaults:
//! configuration problems must not take the process down.

use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::normalize::LabelVocabulary;

pub const DEFAULT_CONFIG_PATH: &str = "config/scan.toml";
pub const ENV_CONFIG_PATH: &str = "SCAN_CONFIG_PATH";

/// The ensemble supports at most two specialized collaborators.
pub const MAX_COLLABORATORS: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_collaborators")]
    pub collaborators: Vec<CollaboratorConfig>,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub face_detector: FaceDetectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    pub name: String,
    /// Human-readable finding this model specializes in, used in headlines.
    #[serde(default = "default_specialty")]
    pub specialty: String,
    /// Inference endpoint accepting raw image bytes. Absent = disabled.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Literal key, or "ENV" to read `<NAME>_API_KEY`.
    #[serde(default)]
    pub api_key: String,
    /// Version-pinned label mapping for this model.
    #[serde(default)]
    pub vocabulary: LabelVocabulary,
}

impl CollaboratorConfig {
    pub fn named(name: impl Into<String>, specialty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            endpoint: None,
            api_key: String::new(),
            vocabulary: LabelVocabulary::default(),
        }
    }

    /// Resolve the API key, honoring the "ENV" sentinel.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return self.api_key.clone();
        }
        let var = format!("{}_API_KEY", env_var_stem(&self.name));
        match env::var(&var) {
            Ok(v) => v,
            Err(_) => {
                warn!(collaborator = %self.name, %var, "api_key=ENV but variable is unset");
                String::new()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Video scanning ships disabled; the endpoint answers with a fixed stub.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
    #[serde(default = "default_max_download_bytes")]
    pub max_download_bytes: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_frames: default_max_frames(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceDetectorConfig {
    /// Detection endpoint accepting raw image bytes, answering face boxes.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

fn default_specialty() -> String {
    "Manipulation".to_string()
}

fn default_max_frames() -> usize {
    5
}

fn default_max_download_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_collaborators() -> Vec<CollaboratorConfig> {
    vec![
        CollaboratorConfig::named("vigilante", "Face swap"),
        CollaboratorConfig::named("sentinel", "AI generation"),
    ]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            collaborators: default_collaborators(),
            video: VideoConfig::default(),
            face_detector: FaceDetectorConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: ScanConfig = toml::from_str(&data)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Startup entry: path from `SCAN_CONFIG_PATH` or the default location;
    /// any failure falls back to built-in defaults with a warning.
    pub fn from_env() -> Self {
        let path = env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(%path, error = %e, "scan config unavailable; using defaults");
                let mut cfg = Self::default();
                cfg.sanitize();
                cfg
            }
        }
    }

    /// Enforce invariants the rest of the service relies on.
    pub fn sanitize(&mut self) {
        if self.collaborators.len() > MAX_COLLABORATORS {
            warn!(
                configured = self.collaborators.len(),
                kept = MAX_COLLABORATORS,
                "too many collaborators; extra entries ignored"
            );
            self.collaborators.truncate(MAX_COLLABORATORS);
        }
        for c in &mut self.collaborators {
            c.name = c.name.trim().to_lowercase();
            c.vocabulary.sanitize();
        }
        self.video.max_frames = self.video.max_frames.clamp(1, 16);
    }

    pub fn collaborator(&self, name: &str) -> Option<&CollaboratorConfig> {
        self.collaborators.iter().find(|c| c.name == name)
    }
}

fn env_var_stem(name: &str) -> String {
    name.trim()
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_carry_two_specialists() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.collaborators.len(), 2);
        assert!(!cfg.video.enabled);
        assert!(cfg.collaborator("vigilante").is_some());
    }

    #[test]
    fn parses_a_minimal_toml_document() {
        let doc = r#"
            [[collaborators]]
            name = "Vigilante"
            specialty = "Face swap"
            endpoint = "https://inference.example/models/vit-swap"
            api_key = "ENV"

            [collaborators.vocabulary]
            fake_labels = ["FAKE", "label_1"]
            real_labels = ["real"]

            [video]
            enabled = true
            max_frames = 99
        "#;
        let mut cfg: ScanConfig = toml::from_str(doc).unwrap();
        cfg.sanitize();

        assert_eq!(cfg.collaborators.len(), 1);
        let c = &cfg.collaborators[0];
        assert_eq!(c.name, "vigilante");
        assert!(c.vocabulary.is_fake("fake"));
        assert!(cfg.video.enabled);
        // max_frames is clamped to a sane bound
        assert_eq!(cfg.video.max_frames, 16);
    }

    #[test]
    fn sanitize_truncates_to_two_collaborators() {
        let mut cfg = ScanConfig::default();
        cfg.collaborators
            .push(CollaboratorConfig::named("third", "Extra"));
        cfg.sanitize();
        assert_eq!(cfg.collaborators.len(), MAX_COLLABORATORS);
    }

    #[test]
    #[serial]
    fn api_key_env_sentinel_reads_the_named_variable() {
        std::env::set_var("VIGILANTE_API_KEY", "s3cret");
        let mut c = CollaboratorConfig::named("vigilante", "Face swap");
        c.api_key = "ENV".into();
        assert_eq!(c.resolved_api_key(), "s3cret");
        std::env::remove_var("VIGILANTE_API_KEY");
        assert_eq!(c.resolved_api_key(), "");
    }

    #[test]
    fn literal_api_key_passes_through() {
        let mut c = CollaboratorConfig::named("sentinel", "AI generation");
        c.api_key = "literal-token".into();
        assert_eq!(c.resolved_api_key(), "literal-token");
    }
}
