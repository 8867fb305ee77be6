//! Error types for the issuefold domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for issuefold operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Summarization backend errors ---
    #[error("Summarizer error: {0}")]
    Summarize(#[from] SummarizeError),

    // --- Issue source errors ---
    #[error("Issue source error: {0}")]
    Source(#[from] SourceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A safety category that caused the backend to withhold output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyFlag {
    pub category: String,
    pub probability: String,
}

impl std::fmt::Display for SafetyFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.category, self.probability)
    }
}

fn describe_block(block_reason: &Option<String>, blocked_categories: &[SafetyFlag]) -> String {
    let mut parts = Vec::new();
    if let Some(reason) = block_reason {
        parts.push(format!("block reason {reason}"));
    }
    if !blocked_categories.is_empty() {
        let flags: Vec<String> = blocked_categories.iter().map(|f| f.to_string()).collect();
        parts.push(format!("blocked categories: {}", flags.join(", ")));
    }
    if parts.is_empty() {
        "no diagnostic given".into()
    } else {
        parts.join("; ")
    }
}

/// Failures of a single `Summarizer::summarize` call.
#[derive(Debug, Clone, Error)]
pub enum SummarizeError {
    /// The backend returned no candidate at all, usually because the prompt
    /// was filtered before generation.
    #[error("No candidates returned ({})", describe_block(.block_reason, .blocked_categories))]
    NoCandidates {
        block_reason: Option<String>,
        blocked_categories: Vec<SafetyFlag>,
    },

    /// A candidate came back but generation did not end with a natural stop.
    #[error("Generation ended early, finish reason: {finish_reason}")]
    IncompleteGeneration { finish_reason: String },

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Summarizer not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures fetching an issue thread.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Issue not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited by issue host: {0}")]
    RateLimited(String),

    #[error("Issue host request failed: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Malformed issue host response: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(String),
}
