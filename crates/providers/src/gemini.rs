//! Gemini API backend (API-key authenticated).
//!
//! Talks to `generativelanguage.googleapis.com`:
//! - `POST /v1beta/models/{model}:generateContent`
//! - `POST /v1beta/models/{model}:countTokens`
//!
//! The key travels in the `x-goog-api-key` header rather than the query
//! string so it never shows up in logged URLs.

use async_trait::async_trait;
use issuefold_core::error::SummarizeError;
use issuefold_core::Summarizer;
use std::time::Duration;

use crate::google::{Auth, DEFAULT_MODEL, GoogleTransport};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Summarizer backed by the Gemini API.
pub struct GeminiSummarizer {
    base_url: String,
    model: String,
    transport: GoogleTransport,
}

impl GeminiSummarizer {
    /// Create a new Gemini backend.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            transport: GoogleTransport::new("gemini", Auth::ApiKey(api_key.into())),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
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
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn count_tokens(&self, text: &str) -> usize {
        self.transport
            .count_tokens(&self.endpoint("countTokens"), text)
            .await
    }

    async fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
        self.transport
            .generate(&self.endpoint("generateContent"), prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_layout() {
        let g = GeminiSummarizer::new("key");
        assert_eq!(
            g.endpoint("generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn custom_base_url_strips_trailing_slash() {
        let g = GeminiSummarizer::new("key")
            .with_base_url("http://localhost:8080/")
            .with_model("gemini-pro");
        assert_eq!(
            g.endpoint("countTokens"),
            "http://localhost:8080/v1beta/models/gemini-pro:countTokens"
        );
    }

    #[test]
    fn builder_sets_generation_settings() {
        let g = GeminiSummarizer::new("key")
            .with_temperature(0.7)
            .with_max_output_tokens(Some(2048));
        assert!((g.transport.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(g.transport.max_output_tokens, Some(2048));
        assert_eq!(g.name(), "gemini");
    }
}
