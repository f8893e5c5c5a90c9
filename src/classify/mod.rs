//! Classification collaborators: provider abstraction over external
//! image-classification endpoints, plus mock/disabled variants for tests
//! and degraded deployments.

mod http;

pub use http::HttpClassifier;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CollaboratorConfig;

/// One (label, score) pair as returned by a classification endpoint.
///
/// No ordering or count is guaranteed; a model may return any number of
/// classes under any vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub score: f32,
}

/// Stateless classification collaborator.
///
/// Implementations may be slow (remote inference); callers own any timeout
/// beyond the client-level ones baked into [`HttpClassifier`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> anyhow::Result<Vec<RawPrediction>>;
    /// Collaborator name for diagnostics.
    fn name(&self) -> &str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Always fails; stands in for a collaborator that is not configured or
/// failed to initialize. Keeps startup non-fatal.
pub struct DisabledClassifier {
    name: String,
}

impl DisabledClassifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Classifier for DisabledClassifier {
    async fn classify(&self, _image: &[u8]) -> anyhow::Result<Vec<RawPrediction>> {
        bail!("classifier '{}' is not available", self.name)
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Deterministic fixture for tests and local runs.
#[derive(Clone)]
pub struct MockClassifier {
    name: String,
    fixed: Vec<RawPrediction>,
}

impl MockClassifier {
    pub fn new(name: impl Into<String>, fixed: Vec<RawPrediction>) -> Self {
        Self {
            name: name.into(),
            fixed,
        }
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _image: &[u8]) -> anyhow::Result<Vec<RawPrediction>> {
        Ok(self.fixed.clone())
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory: build a collaborator client from config and environment.
///
/// * If `SCAN_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if the endpoint is missing, returns a disabled client.
/// * Else builds the real HTTP-backed provider.
pub fn build_classifier(cfg: &CollaboratorConfig) -> DynClassifier {
    if test_mode_mock() {
        return Arc::new(MockClassifier::new(
            &cfg.name,
            vec![RawPrediction {
                label: "real".into(),
                score: 0.98,
            }],
        ));
    }

    match cfg.endpoint.as_deref() {
        Some(endpoint) if !endpoint.trim().is_empty() => {
            info!(collaborator = %cfg.name, %endpoint, "building HTTP classifier");
            Arc::new(HttpClassifier::new(&cfg.name, endpoint, cfg.resolved_api_key()))
        }
        _ => {
            info!(collaborator = %cfg.name, "no endpoint configured; classifier disabled");
            Arc::new(DisabledClassifier::new(&cfg.name))
        }
    }
}

fn test_mode_mock() -> bool {
    std::env::var("SCAN_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
}
