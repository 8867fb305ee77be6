//! Shared transport and wire types for Google's generative language APIs.
//!
//! Gemini (API key) and Vertex AI (project + region) expose the same
//! `generateContent` / `countTokens` request and response shapes and differ
//! only in URL layout and authentication. Both backends go through
//! [`GoogleTransport`], so their error semantics are identical.

use issuefold_core::error::{SafetyFlag, SummarizeError};
use issuefold_core::estimate_tokens;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.2;
pub(crate) const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// The finish reason of a candidate that ended naturally.
const FINISH_STOP: &str = "STOP";

/// How requests are authenticated.
#[derive(Clone)]
pub(crate) enum Auth {
    /// `x-goog-api-key` header
    ApiKey(String),
    /// OAuth bearer token
    Bearer(String),
}

impl Auth {
    fn is_empty(&self) -> bool {
        match self {
            Auth::ApiKey(k) | Auth::Bearer(k) => k.trim().is_empty(),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Auth::ApiKey(key) => request.header("x-goog-api-key", key),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// HTTP client plus the generation settings common to both backends.
pub(crate) struct GoogleTransport {
    backend: &'static str,
    client: reqwest::Client,
    auth: Auth,
    pub(crate) temperature: f32,
    pub(crate) max_output_tokens: Option<u32>,
    /// Counts already handed out, so a text keeps its first count.
    counts: Mutex<HashMap<String, usize>>,
}

impl GoogleTransport {
    pub(crate) fn new(backend: &'static str, auth: Auth) -> Self {
        Self {
            backend,
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            auth,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: None,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.client = build_client(timeout);
    }

    /// Count tokens via `:countTokens`, falling back to the local estimate.
    ///
    /// The first count for a text is remembered, whether it came from the
    /// service or the estimate, so repeated counts always agree.
    pub(crate) async fn count_tokens(&self, url: &str, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        if self.auth.is_empty() {
            return estimate_tokens(text);
        }
        if let Some(count) = self.cached_count(text) {
            return count;
        }

        let count = match self.request_count(url, text).await {
            Ok(count) => count,
            Err(e) => {
                warn!(backend = self.backend, error = %e, "countTokens failed, using estimate");
                estimate_tokens(text)
            }
        };
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(text.to_string()).or_insert(count)
        } else {
            count
        }
    }

    fn cached_count(&self, text: &str) -> Option<usize> {
        self.counts.lock().ok()?.get(text).copied()
    }

    async fn request_count(&self, url: &str, text: &str) -> Result<usize, SummarizeError> {
        let body = serde_json::json!({ "contents": [user_content(text)] });
        let response = self.post(url, &body).await?;
        let parsed: CountTokensResponse = response
            .json()
            .await
            .map_err(|e| SummarizeError::InvalidResponse(format!("countTokens: {e}")))?;
        Ok(parsed.total_tokens)
    }

    /// Run `:generateContent` and interpret the first candidate.
    pub(crate) async fn generate(&self, url: &str, prompt: &str) -> Result<String, SummarizeError> {
        if self.auth.is_empty() {
            return Err(SummarizeError::NotConfigured(format!(
                "no credentials configured for {}",
                self.backend
            )));
        }

        let mut generation_config = serde_json::json!({ "temperature": self.temperature });
        if let Some(max) = self.max_output_tokens {
            generation_config["maxOutputTokens"] = serde_json::json!(max);
        }
        let body = serde_json::json!({
            "contents": [user_content(prompt)],
            "generationConfig": generation_config,
        });

        debug!(backend = self.backend, prompt_chars = prompt.len(), "Sending generateContent request");

        let response = self.post(url, &body).await?;
        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            SummarizeError::InvalidResponse(format!("Failed to parse {} response: {e}", self.backend))
        })?;

        interpret_response(parsed)
    }

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, SummarizeError> {
        let response = self
            .auth
            .apply(self.client.post(url))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SummarizeError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(SummarizeError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::AuthenticationFailed(format!(
                "{} rejected the credentials: {}",
                self.backend,
                error_message(&error_body)
            )));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(backend = self.backend, status, body = %error_body, "API error");
            return Err(SummarizeError::ApiError {
                status_code: status,
                message: error_message(&error_body),
            });
        }

        Ok(response)
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

fn user_content(text: &str) -> serde_json::Value {
    serde_json::json!({ "role": "user", "parts": [{ "text": text }] })
}

/// Pull `error.message` out of a Google error envelope, or return the body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Turn a `generateContent` response into summary text or a typed failure.
pub(crate) fn interpret_response(
    resp: GenerateContentResponse,
) -> Result<String, SummarizeError> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        let feedback = resp.prompt_feedback.unwrap_or_default();
        let blocked_categories = feedback
            .safety_ratings
            .into_iter()
            .filter(|r| r.blocked)
            .map(|r| SafetyFlag {
                category: r.category,
                probability: r.probability,
            })
            .collect();
        return Err(SummarizeError::NoCandidates {
            block_reason: feedback
                .block_reason
                .filter(|r| r != "BLOCK_REASON_UNSPECIFIED"),
            blocked_categories,
        });
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != FINISH_STOP {
            return Err(SummarizeError::IncompleteGeneration {
                finish_reason: reason.to_string(),
            });
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(text)
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    #[serde(default)]
    probability: String,
    #[serde(default)]
    blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    #[serde(default)]
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_text_candidate() {
        let resp = parse(
            r##"{
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "# Title\n"}, {"text": "Body"}]},
                    "finishReason": "STOP",
                    "safetyRatings": []
                }],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3}
            }"##,
        );
        assert_eq!(interpret_response(resp).unwrap(), "# Title\nBody");
    }

    #[test]
    fn blocked_prompt_reports_reason_and_categories() {
        let resp = parse(
            r#"{
                "promptFeedback": {
                    "blockReason": "SAFETY",
                    "safetyRatings": [
                        {"category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH", "blocked": true},
                        {"category": "HARM_CATEGORY_HATE_SPEECH", "probability": "NEGLIGIBLE"}
                    ]
                }
            }"#,
        );
        match interpret_response(resp).unwrap_err() {
            SummarizeError::NoCandidates {
                block_reason,
                blocked_categories,
            } => {
                assert_eq!(block_reason.as_deref(), Some("SAFETY"));
                assert_eq!(blocked_categories.len(), 1);
                assert_eq!(blocked_categories[0].category, "HARM_CATEGORY_HARASSMENT");
                assert_eq!(blocked_categories[0].probability, "HIGH");
            }
            other => panic!("Expected NoCandidates, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_is_no_candidates() {
        let resp = parse("{}");
        assert!(matches!(
            interpret_response(resp),
            Err(SummarizeError::NoCandidates { block_reason: None, .. })
        ));
    }

    #[test]
    fn unspecified_block_reason_is_dropped() {
        let resp = parse(r#"{"promptFeedback": {"blockReason": "BLOCK_REASON_UNSPECIFIED"}}"#);
        assert!(matches!(
            interpret_response(resp),
            Err(SummarizeError::NoCandidates { block_reason: None, .. })
        ));
    }

    #[test]
    fn truncated_generation_is_incomplete() {
        let resp = parse(
            r#"{"candidates": [{"content": {"parts": [{"text": "partial"}]}, "finishReason": "MAX_TOKENS"}]}"#,
        );
        match interpret_response(resp).unwrap_err() {
            SummarizeError::IncompleteGeneration { finish_reason } => {
                assert_eq!(finish_reason, "MAX_TOKENS");
            }
            other => panic!("Expected IncompleteGeneration, got {other:?}"),
        }
    }

    #[test]
    fn safety_stop_is_incomplete() {
        let resp = parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#);
        assert!(matches!(
            interpret_response(resp),
            Err(SummarizeError::IncompleteGeneration { .. })
        ));
    }

    #[test]
    fn count_tokens_response_parses() {
        let resp: CountTokensResponse = serde_json::from_str(r#"{"totalTokens": 42}"#).unwrap();
        assert_eq!(resp.total_tokens, 42);
    }

    #[test]
    fn error_message_extracts_google_envelope() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn missing_credentials_never_hit_the_network() {
        let transport = GoogleTransport::new("gemini", Auth::ApiKey(String::new()));
        let err = transport
            .generate("http://127.0.0.1:9/unreachable", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::NotConfigured(_)));
        assert_eq!(
            transport.count_tokens("http://127.0.0.1:9/unreachable", "abcdefgh").await,
            2
        );
    }
}
