//! Vertex AI backend (project- and region-scoped).
//!
//! Uses the regional endpoint
//! `https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:{method}`
//! with an OAuth bearer token.

use async_trait::async_trait;
use issuefold_core::error::SummarizeError;
use issuefold_core::Summarizer;
use std::time::Duration;

use crate::google::{Auth, DEFAULT_MODEL, GoogleTransport};

/// Summarizer backed by Gemini models on Vertex AI.
pub struct VertexSummarizer {
    base_url: String,
    project_id: String,
    region: String,
    model: String,
    transport: GoogleTransport,
}

impl VertexSummarizer {
    /// Create a new Vertex AI backend.
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        let region = region.into();
        Self {
            base_url: format!("https://{region}-aiplatform.googleapis.com"),
            project_id: project_id.into(),
            region,
            model: DEFAULT_MODEL.into(),
            transport: GoogleTransport::new("vertex", Auth::Bearer(access_token.into())),
        }
    }

    /// Create with a custom base URL (e.g., for testing or private endpoints).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.transport.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max: Option<u32>) -> Self {
        self.transport.max_output_tokens = max;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.set_timeout(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.base_url, self.project_id, self.region, self.model, method
        )
    }
}

#[async_trait]
impl Summarizer for VertexSummarizer {
    fn name(&self) -> &str {
        "vertex"
    }

    async fn count_tokens(&self, text: &str) -> usize {
        self.transport
            .count_tokens(&self.endpoint("countTokens"), text)
            .await
    }

    async fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
        if self.project_id.trim().is_empty() {
            return Err(SummarizeError::NotConfigured(
                "vertex backend needs a project id".into(),
            ));
        }
        self.transport
            .generate(&self.endpoint("generateContent"), prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_endpoint_layout() {
        let v = VertexSummarizer::new("demo", "europe-west4", "ya29.token");
        assert_eq!(
            v.endpoint("generateContent"),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/demo/locations/europe-west4/publishers/google/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn base_url_override_keeps_path() {
        let v = VertexSummarizer::new("demo", "us-central1", "t")
            .with_base_url("http://127.0.0.1:3000/")
            .with_model("gemini-pro");
        assert_eq!(
            v.endpoint("countTokens"),
            "http://127.0.0.1:3000/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-pro:countTokens"
        );
    }

    #[tokio::test]
    async fn missing_project_is_not_configured() {
        let v = VertexSummarizer::new("", "us-central1", "token");
        let err = v.summarize("prompt").await.unwrap_err();
        assert!(matches!(err, SummarizeError::NotConfigured(_)));
    }
}
