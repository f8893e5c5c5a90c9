//! HTTP-backed classification provider.
//!
//! Targets hosted-inference endpoints that accept raw image bytes and answer
//! with a JSON array of `{label, score}` objects. Bearer auth is optional.

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;

use super::{Classifier, RawPrediction};

pub struct HttpClassifier {
    name: String,
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpClassifier {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("media-sentinel/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            name: name.into(),
            http,
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> anyhow::Result<Vec<RawPrediction>> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("classifier '{}' request failed", self.name))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("classifier '{}' returned HTTP {}", self.name, status);
        }

        let predictions: Vec<RawPrediction> = resp
            .json()
            .await
            .with_context(|| format!("classifier '{}' sent malformed JSON", self.name))?;
        Ok(predictions)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
